//! Command-line front end: inspect, dump and unpack Mobipocket files.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use kindling::exth;
use kindling::resource::file_meta;
use kindling::{ExthValue, Mobi};

#[derive(Parser)]
#[command(name = "kindling", version, about = "Decode Mobipocket (MOBI/AZW) ebooks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print document and EXTH metadata
    Info {
        path: PathBuf,
        /// Read the legacy KF7 half of a hybrid file
        #[arg(long)]
        kf7: bool,
    },
    /// Dump the decompressed text flow
    Dump {
        path: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Read the legacy KF7 half of a hybrid file
        #[arg(long)]
        kf7: bool,
    },
    /// Extract embedded resources into a directory
    Resources {
        path: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "resources")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> kindling::Result<()> {
    match command {
        Command::Info { path, kf7 } => {
            let mut doc = Mobi::from_path(path)?;
            if kf7 {
                doc.use_kf7();
            }
            print_info(&doc)
        }
        Command::Dump { path, output, kf7 } => {
            let mut doc = Mobi::from_path(path)?;
            if kf7 {
                doc.use_kf7();
            }
            match output {
                Some(path) => {
                    let mut file = fs::File::create(path)?;
                    doc.dump_text(&mut file)
                }
                None => doc.dump_text(&mut std::io::stdout().lock()),
            }
        }
        Command::Resources { path, output } => {
            let doc = Mobi::from_path(path)?;
            fs::create_dir_all(&output)?;
            let parts = doc.resources();
            for part in &parts {
                let meta = file_meta(part.kind);
                let name = output.join(format!("resource{:05}.{}", part.seq, meta.extension));
                fs::write(&name, &part.data)?;
                println!("{} ({}, {} bytes)", name.display(), meta.mime_type, part.data.len());
            }
            println!("{} resources extracted", parts.len());
            Ok(())
        }
    }
}

fn print_info(doc: &Mobi) -> kindling::Result<()> {
    println!("Database name: {}", doc.pdb_header().name);
    match doc.full_name() {
        Ok(name) => println!("Full name: {name}"),
        Err(e) => println!("Full name: <{e}>"),
    }
    println!("File version: {}", doc.file_version());
    println!("Compression: {:?}", doc.compression());
    println!("Encrypted: {}", doc.is_encrypted());
    println!("Hybrid: {}", doc.is_hybrid());
    if let Some(locale) = doc.locale() {
        println!("Locale: {locale}");
    }
    println!("Records: {}", doc.records().len());

    if !doc.exth_records().is_empty() {
        println!("EXTH metadata:");
        for record in doc.exth_records() {
            let label = exth::tag_meta(record.tag).map_or("Unknown", |meta| meta.name);
            match record.decode(doc.encoding()) {
                Ok(ExthValue::String(s)) => println!("  {label} ({}): {s}", record.tag),
                Ok(ExthValue::Numeric(n)) => println!("  {label} ({}): {n}", record.tag),
                Ok(ExthValue::Binary(b)) => {
                    println!("  {label} ({}): {} bytes of binary data", record.tag, b.len());
                }
                Err(e) => println!("  {label} ({}): <{e}>", record.tag),
            }
        }
    }
    Ok(())
}
