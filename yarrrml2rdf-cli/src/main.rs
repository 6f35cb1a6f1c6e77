use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// Transform a JSON record file into an RDF (Turtle) file.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// JSON source file to be transformed
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// Turtle file that will contain the RDF result
    #[arg(value_name = "DESTINATION")]
    destination: PathBuf,

    /// YARRRML mapping file
    #[arg(value_name = "MAPPING")]
    mapping: PathBuf,

    /// Print debug messages
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_filter = if args.debug { "yarrrml2rdf=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mapping = std::fs::read_to_string(&args.mapping)?;
    let rules = match yarrrml2rdf::compile(&mapping) {
        Ok(rules) => rules,
        Err(error) => {
            eprintln!("Error: {error}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let source = std::fs::read_to_string(&args.source)?;
    let records = match yarrrml2rdf::parse_records(&source) {
        Ok(records) => records,
        Err(error) => {
            eprintln!("Error: {error}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut graph = oxrdf::Graph::new();
    rules.transform(&records, &mut graph);

    // serialize with every resolved prefix registered
    let serializer = rules.prefixes().iter().try_fold(
        oxttl::TurtleSerializer::new(),
        |serializer, (prefix, namespace)| {
            serializer.with_prefix(prefix.trim_end_matches(':'), namespace)
        },
    )?;

    let destination = std::fs::File::create(&args.destination)?;
    let mut writer = serializer.for_writer(std::io::BufWriter::new(destination));
    for triple in graph.iter() {
        writer.serialize_triple(triple)?;
    }
    writer.finish()?.flush()?;

    println!("RDF exported to {}", args.destination.display());
    Ok(ExitCode::SUCCESS)
}
