use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use cognate_crypto::Ed25519EntrySigner;
use cognate_ledger::{
    read_jsonl, AnnotationUpdate, EventPayload, Ledger, LedgerBuilder, LedgerConfig,
    LedgerFilter, LedgerReader, Page, Pagination, SequenceRange, Sort, VerificationOutcome,
};
use cognate_types::LedgerEntry;
use tracing::debug;

use crate::cli::*;

/// Options shared by every command.
pub struct Session {
    pub ledger_path: PathBuf,
    pub config: LedgerConfig,
    pub signer: Option<Arc<Ed25519EntrySigner>>,
    pub format: OutputFormat,
}

impl Session {
    fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => LedgerConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => LedgerConfig::default(),
        };
        let signer = match &cli.signing_key {
            Some(path) => Some(Arc::new(load_signer(path, &cli.key_id)?)),
            None => None,
        };
        // A key on the command line means sign.
        if signer.is_some() {
            config.sign_entries = true;
        }
        Ok(Self {
            ledger_path: cli.ledger.clone(),
            config,
            signer,
            format: cli.format,
        })
    }

    fn builder(&self) -> LedgerBuilder {
        let builder = Ledger::builder().config(self.config.clone());
        match &self.signer {
            Some(signer) => builder.signer(signer.clone()),
            None => builder,
        }
    }

    fn entries(&self) -> anyhow::Result<Vec<LedgerEntry>> {
        if !self.ledger_path.exists() {
            debug!(path = %self.ledger_path.display(), "ledger file missing; starting empty");
            return Ok(Vec::new());
        }
        let file = File::open(&self.ledger_path)
            .with_context(|| format!("opening {}", self.ledger_path.display()))?;
        Ok(read_jsonl(BufReader::new(file))?)
    }

    /// Load and verify; used before any change so nothing is appended to a
    /// broken chain.
    fn open_verified(&self) -> anyhow::Result<Ledger> {
        Ok(self.builder().restore(self.entries()?)?)
    }

    /// Load without checking the chain, for audits.
    fn open_unverified(&self) -> anyhow::Result<Ledger> {
        Ok(self.builder().load_unverified(self.entries()?)?)
    }

    /// Write the ledger back through a temporary file so a failed write
    /// leaves the previous export in place.
    fn save(&self, ledger: &Ledger) -> anyhow::Result<()> {
        let tmp = self.ledger_path.with_extension("jsonl.tmp");
        let file = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        ledger.export_jsonl(io::BufWriter::new(file))?;
        fs::rename(&tmp, &self.ledger_path)
            .with_context(|| format!("replacing {}", self.ledger_path.display()))?;
        Ok(())
    }
}

fn load_signer(path: &Path, key_id: &str) -> anyhow::Result<Ed25519EntrySigner> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading signing key {}", path.display()))?;
    let bytes = hex::decode(text.trim()).context("signing key is not hex")?;
    let secret: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow!("signing key must be 32 bytes, got {}", b.len()))?;
    Ok(Ed25519EntrySigner::from_bytes(secret, key_id))
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ctx = Session::from_cli(&cli)?;
    match cli.command {
        Command::Append(args) => cmd_append(&ctx, args),
        Command::Verify(args) => cmd_verify(&ctx, args),
        Command::Query(args) => cmd_query(&ctx, args),
        Command::Show(args) => cmd_show(&ctx, args),
        Command::Annotate(args) => cmd_annotate(&ctx, args),
        Command::Stats => cmd_stats(&ctx),
        Command::Checkpoint(args) => cmd_checkpoint(&ctx, args),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_entry_line(entry: &LedgerEntry) {
    let flag = if entry.is_flagged() { "⚑".red().to_string() } else { " ".into() };
    println!(
        "{} {} {} {:<8} {:<13} {} ({} {})",
        format!("#{}", entry.sequence).yellow().bold(),
        flag,
        entry.event.when.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
        entry.event.what.severity.to_string(),
        entry.event.what.category.to_string().cyan(),
        entry.event.what.description,
        entry.event.who.actor_type,
        entry.event.who.name,
    );
}

fn range_of(args: &RangeArgs) -> SequenceRange {
    match (args.from, args.to) {
        (None, None) => SequenceRange::All,
        (from, to) => SequenceRange::new(from.unwrap_or(0), to.unwrap_or(u64::MAX)),
    }
}

fn read_payload(source: &str) -> anyhow::Result<EventPayload> {
    let mut text = String::new();
    if source == "-" {
        io::stdin().read_to_string(&mut text)?;
    } else {
        text = fs::read_to_string(source).with_context(|| format!("reading {source}"))?;
    }
    Ok(EventPayload::from_json(&text)?)
}

pub fn cmd_append(ctx: &Session, args: AppendArgs) -> anyhow::Result<()> {
    let payload = read_payload(&args.payload)?;
    let ledger = ctx.open_verified()?;
    let entry = ledger.append(payload)?;
    ctx.save(&ledger)?;

    match ctx.format {
        OutputFormat::Json => print_json(&entry),
        OutputFormat::Text => {
            println!("{} Recorded entry {}", "✓".green().bold(), entry.sequence.to_string().yellow());
            println!("  Content hash: {}", entry.content_hash().to_hex().cyan());
            println!("  Previous:     {}", entry.previous_hash().short_hex().dimmed());
            if let Some(key_id) = &entry.crypto.key_id {
                println!("  Signed by:    {}", key_id.bold());
            }
            Ok(())
        }
    }
}

pub fn cmd_verify(ctx: &Session, args: RangeArgs) -> anyhow::Result<()> {
    let ledger = ctx.open_unverified()?;
    let report = ledger.verify(range_of(&args))?;

    match ctx.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => match &report.outcome {
            VerificationOutcome::Valid => {
                println!("{} Ledger chain integrity verified", "✓".green().bold());
                println!("  Entries checked: {}", report.checked.to_string().bold());
                if let (Some(first), Some(last)) = (report.first, report.last) {
                    println!("  Range: {first}..={last}");
                }
            }
            VerificationOutcome::BrokenAt(link) => {
                println!(
                    "{} Chain broken at sequence {}",
                    "✗".red().bold(),
                    link.sequence.to_string().red().bold()
                );
                println!("  Check: {:?}", link.kind);
                println!("  {}", link.detail);
                println!("  Entries verified before the break: {}", report.checked);
            }
        },
    }

    match report.broken_at() {
        Some(sequence) => bail!("chain integrity failure at sequence {sequence}"),
        None => Ok(()),
    }
}

fn filter_of(args: &QueryArgs) -> LedgerFilter {
    LedgerFilter {
        actor_types: args.actor_types.iter().copied().collect(),
        categories: args.categories.iter().copied().collect(),
        severities: args.severities.iter().copied().collect(),
        statuses: args.statuses.iter().copied().collect(),
        space_ids: args.spaces.iter().cloned().collect(),
        project_ids: args.projects.iter().cloned().collect(),
        tags: args.tags.iter().cloned().collect(),
        flagged_only: args.flagged,
        date_from: args.since,
        date_to: args.until,
        search: args.search.clone(),
    }
}

pub fn run_query(ctx: &Session, args: &QueryArgs) -> anyhow::Result<Page> {
    let ledger = ctx.open_unverified()?;
    let pagination = match &args.cursor {
        Some(cursor) => Pagination::Cursor {
            after: Some(cursor.clone()),
            limit: args.page_size,
        },
        None => Pagination::Page {
            page: args.page,
            page_size: args.page_size,
        },
    };
    Ok(ledger.query(&filter_of(args), Sort::new(args.sort, args.direction), &pagination)?)
}

pub fn cmd_query(ctx: &Session, args: QueryArgs) -> anyhow::Result<()> {
    let page = run_query(ctx, &args)?;
    if ctx.format == OutputFormat::Json {
        return print_json(&page);
    }

    if page.degraded() {
        println!("{} index inconsistent; results came from a full scan", "!".yellow().bold());
    }
    for entry in &page.entries {
        print_entry_line(entry);
    }
    match page.page {
        Some(number) => println!(
            "\nPage {} of {} ({} matching)",
            number,
            page.total_pages,
            page.total_count.to_string().bold()
        ),
        None => println!("\n{} of {} matching", page.entries.len(), page.total_count.to_string().bold()),
    }
    if let Some(cursor) = &page.next_cursor {
        println!("Next cursor: {}", cursor.dimmed());
    }
    Ok(())
}

pub fn cmd_show(ctx: &Session, args: ShowArgs) -> anyhow::Result<()> {
    let ledger = ctx.open_unverified()?;
    let entry = ledger
        .get(args.sequence)?
        .ok_or_else(|| anyhow!("no entry at sequence {}", args.sequence))?;
    match ctx.format {
        OutputFormat::Json => print_json(&entry),
        OutputFormat::Text => {
            print_entry_line(&entry);
            println!("  Id:       {}", entry.id);
            println!("  Who:      {} {} ({})", entry.event.who.actor_type, entry.event.who.id, entry.event.who.name);
            println!("  What:     {} [{}]", entry.event.what.action_type, entry.event.what.status);
            println!("  Why:      {}", entry.event.why.trigger);
            println!("  How:      {}", entry.event.how.approach);
            if !entry.tags.is_empty() {
                let tags: Vec<&str> = entry.tags.iter().map(String::as_str).collect();
                println!("  Tags:     {}", tags.join(", "));
            }
            println!("  Hash:     {}", entry.content_hash().to_hex().cyan());
            println!("  Previous: {}", entry.previous_hash().to_hex().dimmed());
            if let Some(status) = entry.annotation().review_status {
                println!("  Review:   {status}");
            }
            if let Some(notes) = &entry.annotation().notes {
                println!("  Notes:    {notes}");
            }
            Ok(())
        }
    }
}

pub fn cmd_annotate(ctx: &Session, args: AnnotateArgs) -> anyhow::Result<()> {
    let mut update = AnnotationUpdate::default();
    if args.flag {
        update.is_flagged = Some(true);
    } else if args.unflag {
        update.is_flagged = Some(false);
    }
    if let Some(status) = args.review {
        update.review_status = Some(Some(status));
    }
    if let Some(notes) = args.notes {
        update.notes = Some(Some(notes));
    }
    if update == AnnotationUpdate::default() {
        bail!("nothing to change: pass --flag, --unflag, --review, or --notes");
    }

    let ledger = ctx.open_verified()?;
    let entry = ledger.annotate(args.sequence, update)?;
    ctx.save(&ledger)?;

    match ctx.format {
        OutputFormat::Json => print_json(&entry),
        OutputFormat::Text => {
            println!("{} Annotated entry {}", "✓".green().bold(), entry.sequence.to_string().yellow());
            Ok(())
        }
    }
}

pub fn cmd_stats(ctx: &Session) -> anyhow::Result<()> {
    let ledger = ctx.open_unverified()?;
    let stats = ledger.stats()?;
    if ctx.format == OutputFormat::Json {
        return print_json(&stats);
    }

    println!("Entries: {}", stats.total_entries.to_string().bold());
    if let (Some(first), Some(last)) = (stats.first_sequence, stats.last_sequence) {
        println!("Sequences: {first}..={last}");
    }
    if let Some(head) = stats.head_hash {
        println!("Head: {}", head.to_hex().cyan());
    }
    println!("Flagged: {}", stats.flagged);
    println!("\nBy category:");
    for (category, count) in &stats.by_category {
        println!("  {:<14} {count}", category.to_string());
    }
    println!("By actor type:");
    for (actor, count) in &stats.by_actor_type {
        println!("  {:<14} {count}", actor.to_string());
    }
    println!("By severity:");
    for (severity, count) in &stats.by_severity {
        println!("  {:<14} {count}", severity.to_string());
    }
    Ok(())
}

pub fn cmd_checkpoint(ctx: &Session, args: CheckpointArgs) -> anyhow::Result<()> {
    let ledger = ctx.open_verified()?;
    let Some(checkpoint) = ledger.checkpoint(range_of(&args.range))? else {
        bail!("no entries in range");
    };
    let proof = match args.prove {
        Some(sequence) => Some(
            checkpoint
                .proof(sequence)
                .ok_or_else(|| anyhow!("sequence {sequence} is outside the checkpoint"))?,
        ),
        None => None,
    };

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "checkpoint": checkpoint,
            "proof": proof,
        })),
        OutputFormat::Text => {
            println!("Checkpoint {}..={} ({} entries)", checkpoint.from, checkpoint.to, checkpoint.entry_count);
            println!("  Merkle root: {}", checkpoint.merkle_root.to_hex().cyan());
            println!("  Tail hash:   {}", checkpoint.tail_hash.to_hex().dimmed());
            if let Some(proof) = proof {
                let verdict = if proof.verify(&checkpoint.merkle_root) {
                    "valid".green()
                } else {
                    "invalid".red()
                };
                println!("  Proof for #{}: {} steps, {}", proof.sequence, proof.proof.path.len(), verdict);
            }
            Ok(())
        }
    }
}
