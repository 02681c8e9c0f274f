mod analysis;
mod correct;
mod corrupt;
mod decode;
mod logging;
mod models;
mod pix;
mod preflight;
mod reference;
mod schedule;
mod util;

use analysis::{analyze_financials_csv, FinancialReport};
use clap::{Parser, Subcommand};
use models::InstallmentRecord;
use rand::Rng;
use reference::{key_kind, is_valid_amount, MAX_AMOUNT};
use schedule::{build_installments, PlanConfig};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "carne-pix")]
#[command(about = "PIX carne (installment booklet) generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Generate(GenerateArgs),
    Encode(EncodeArgs),
    Decode(DecodeArgs),
    Analyze(AnalyzeArgs),
    Preflight(PreflightArgs),
    Corrupt(CorruptArgs),
    Correct(CorrectArgs),
}

#[derive(Parser)]
struct GenerateArgs {
    #[arg(long)]
    customer_name: String,
    #[arg(long)]
    customer_document: Option<String>,
    #[arg(long)]
    title: String,
    #[arg(long)]
    total_amount: f64,
    #[arg(long, default_value_t = 12)]
    installments: u32,
    #[arg(long)]
    first_due_date: Option<String>,
    #[arg(long)]
    pix_key: String,
    #[arg(long, default_value = "MINHA EMPRESA LTDA")]
    merchant_name: String,
    #[arg(long, default_value = "SAO PAULO")]
    merchant_city: String,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "data/carnes.csv")]
    output: PathBuf,
}

#[derive(Parser)]
struct EncodeArgs {
    #[arg(long)]
    pix_key: String,
    #[arg(long, default_value = "MINHA EMPRESA LTDA")]
    merchant_name: String,
    #[arg(long, default_value = "SAO PAULO")]
    merchant_city: String,
    #[arg(long)]
    amount: f64,
    #[arg(long)]
    txid: Option<String>,
}

#[derive(Parser)]
struct DecodeArgs {
    #[arg(long)]
    payload: String,
}

#[derive(Parser)]
struct AnalyzeArgs {
    #[arg(long, default_value = "data/carnes.csv")]
    input: PathBuf,
    #[arg(long)]
    as_of: Option<String>,
}

#[derive(Parser)]
struct PreflightArgs {
    #[arg(long, default_value = "data/carnes.csv")]
    input: PathBuf,
}

#[derive(Parser)]
struct CorruptArgs {
    #[arg(long, default_value = "data/carnes.csv")]
    input: PathBuf,
    #[arg(long, default_value = "data/carnes_invalid.csv")]
    output: PathBuf,
    #[arg(long, default_value_t = 0.05)]
    error_rate: f64,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Parser)]
struct CorrectArgs {
    #[arg(long, default_value = "data/carnes_invalid.csv")]
    input: PathBuf,
    #[arg(long, default_value = "data/carnes_corrected.csv")]
    output: PathBuf,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    logging::init_logging("carne-pix")?;
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Encode(args) => run_encode(args),
        Command::Decode(args) => run_decode(args),
        Command::Analyze(args) => run_analyze(args),
        Command::Preflight(args) => run_preflight(args),
        Command::Corrupt(args) => run_corrupt(args),
        Command::Correct(args) => run_correct(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), String> {
    let first_due_date = resolve_date(args.first_due_date.as_deref())?;
    let seed = args.seed.unwrap_or_else(random_seed);

    let config = PlanConfig {
        customer_name: args.customer_name,
        customer_document: args.customer_document,
        title: args.title,
        total_amount: args.total_amount,
        installments: args.installments,
        first_due_date,
        pix_key: args.pix_key,
        merchant_name: args.merchant_name,
        merchant_city: args.merchant_city,
    };

    if key_kind(&config.pix_key).is_none() {
        log::warn!(
            "pix key {} does not match a known key shape",
            config.pix_key
        );
    }

    log::info!(
        "Generating {} installment(s) of {:.2} starting {} (seed {})",
        config.installments,
        config.total_amount / config.installments.max(1) as f64,
        first_due_date,
        seed
    );
    let gen_start = Instant::now();
    let records = build_installments(&config, seed)?;
    let gen_elapsed = gen_start.elapsed();
    write_csv(&args.output, &records)?;

    let carne_id = records
        .first()
        .map(|record| record.carne_id.clone())
        .unwrap_or_default();
    log::info!(
        "generated carne {} with {} installment(s), output {}",
        carne_id,
        records.len(),
        args.output.display()
    );
    emit_info_line(&format!("Generation time: {} ms", gen_elapsed.as_millis()));

    let as_of = chrono::Local::now().date_naive();
    let report = analyze_financials_csv(&args.output, as_of)?;
    log_financial_report(&report);

    Ok(())
}

fn run_encode(args: EncodeArgs) -> Result<(), String> {
    if !is_valid_amount(args.amount) {
        return Err(format!(
            "amount must be greater than 0.00 and at most {:.2}",
            MAX_AMOUNT
        ));
    }
    if pix::sanitize_key(&args.pix_key).is_empty() {
        return Err("pix key is empty after sanitization".to_string());
    }
    if key_kind(&args.pix_key).is_none() {
        log::warn!("pix key {} does not match a known key shape", args.pix_key);
    }

    let payload = pix::encode_pix_payload(
        &args.pix_key,
        &args.merchant_name,
        &args.merchant_city,
        args.amount,
        args.txid.as_deref(),
    );
    log::debug!("payload length: {} characters", payload.len());
    println!("{payload}");
    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<(), String> {
    let decoded = decode::decode_payload(args.payload.trim())?;
    emit_info_line("Checksum OK");
    emit_info_line(&format!("Key: {}", decoded.key));
    emit_info_line(&format!("Merchant name: {}", decoded.merchant_name));
    emit_info_line(&format!("Merchant city: {}", decoded.merchant_city));
    emit_info_line(&format!("Amount: {}", decoded.amount));
    emit_info_line(&format!("Txid: {}", decoded.txid));
    emit_info_line(&format!(
        "Currency: {} Country: {}",
        decoded.currency, decoded.country
    ));
    Ok(())
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), String> {
    let as_of = resolve_date(args.as_of.as_deref())?;
    let analysis_start = Instant::now();
    let report = analyze_financials_csv(&args.input, as_of)?;
    let analysis_elapsed = analysis_start.elapsed();
    log_financial_report(&report);
    emit_info_line(&format!(
        "Analysis time: {} ms",
        analysis_elapsed.as_millis()
    ));
    Ok(())
}

fn run_preflight(args: PreflightArgs) -> Result<(), String> {
    let report = preflight::preflight_csv(&args.input)?;

    emit_info_line(&format!(
        "Preflight: records={} carnes={}",
        report.total_records, report.total_carnes
    ));
    emit_info_line(&format!(
        "Preflight issues: errors={} warnings={}",
        report.error_count(),
        report.warning_count()
    ));

    emit_issue_summary("error", &report.issues, preflight::IssueLevel::Error);
    emit_issue_summary("warning", &report.issues, preflight::IssueLevel::Warning);

    if report.error_count() > 0 {
        return Err(format!(
            "preflight failed with {} error(s)",
            report.error_count()
        ));
    }

    Ok(())
}

fn run_corrupt(args: CorruptArgs) -> Result<(), String> {
    let seed = args.seed.unwrap_or_else(random_seed);
    let summary = corrupt::corrupt_csv(&args.input, &args.output, args.error_rate, seed)?;

    emit_info_line(&format!(
        "Corrupt: input={} output={} seed={}",
        args.input.display(),
        args.output.display(),
        seed
    ));
    emit_info_line(&format!(
        "Corrupted records: {} / {}",
        summary.records_targeted, summary.total_records
    ));
    emit_info_line(&format!(
        "Corruptions: payload_char={} payload_truncated={} merchant_name={} amount={}",
        summary.payload_char_flipped,
        summary.payload_truncated,
        summary.merchant_name_missing,
        summary.amount_invalid
    ));

    Ok(())
}

fn run_correct(args: CorrectArgs) -> Result<(), String> {
    let summary = correct::correct_csv(&args.input, &args.output)?;

    emit_info_line(&format!(
        "Correct: input={} output={}",
        args.input.display(),
        args.output.display()
    ));
    emit_info_line(&format!(
        "Corrected records: {} / {}",
        summary.corrected_records, summary.total_records
    ));
    emit_info_line(&format!(
        "Corrections: amount={} status={} merchant_name={} payload_reencoded={}",
        summary.amount_fixed,
        summary.status_fixed,
        summary.merchant_name_restored,
        summary.payload_reencoded
    ));

    Ok(())
}

fn emit_issue_summary(
    label: &str,
    issues: &[preflight::PreflightIssue],
    level: preflight::IssueLevel,
) {
    let mut counts = std::collections::HashMap::new();
    for issue in issues.iter().filter(|issue| issue.level == level) {
        *counts.entry(issue.message.as_str()).or_insert(0usize) += 1;
    }
    if counts.is_empty() {
        return;
    }

    let mut items: Vec<(&str, usize)> = counts.into_iter().collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let max_items = 5usize;
    for (message, count) in items.iter().take(max_items) {
        emit_info_line(&format!("Preflight {}s: {} = {}", label, message, count));
    }
    if items.len() > max_items {
        emit_info_line(&format!(
            "Preflight {}s: {} additional issue types not shown",
            label,
            items.len() - max_items
        ));
    }
}

fn log_financial_report(report: &FinancialReport) {
    emit_info_line(&format!(
        "Financials as of {}: installments={} total={:.2}",
        report.as_of, report.total_installments, report.total_amount
    ));
    emit_info_line(&format!(
        "Paid: {} ({:.2})  Open: {} ({:.2})  Overdue: {} ({:.2})",
        report.paid_count,
        report.paid_amount,
        report.open_count,
        report.open_amount,
        report.overdue_count,
        report.overdue_amount
    ));
    emit_info_line(&format!("Collection rate: {:.1}%", report.collection_rate));
    for flow in &report.monthly_flow {
        emit_info_line(&format!(
            "Month {}: total={:.2} paid={:.2} overdue={:.2}",
            flow.month, flow.total, flow.paid, flow.overdue
        ));
    }
}

fn resolve_date(value: Option<&str>) -> Result<chrono::NaiveDate, String> {
    match value {
        Some(raw) => util::parse_due_date(raw),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn random_seed() -> u64 {
    let mut rng = rand::rngs::OsRng;
    rng.gen()
}

fn write_csv(output: &Path, records: &[InstallmentRecord]) -> Result<(), String> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| err.to_string())?;
        }
    }
    let mut writer = csv::Writer::from_path(output).map_err(|err| err.to_string())?;
    for record in records {
        writer.serialize(record).map_err(|err| err.to_string())?;
    }
    writer.flush().map_err(|err| err.to_string())
}

fn emit_info_line(message: &str) {
    if log::log_enabled!(log::Level::Info) {
        log::info!("{}", message);
    } else {
        println!("{message}");
    }
}
