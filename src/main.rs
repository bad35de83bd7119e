use anyhow::{Context, Result};
use blockmesh::generator::{GeoOptions, generate_geo_script};
use blockmesh::model::GeoDoc;
use blockmesh::parser::{FsSource, IncludeResolver, InputParser};
use blockmesh::registry::Registry;
use camino::Utf8PathBuf;
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build block-structured geometry and generate a Gmsh .geo script", long_about = None)]
struct Cli {
    /// Input JSON document
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output .geo path (defaults to the input stem + .geo)
    #[arg(short, long)]
    output: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Recombine all surfaces into quadrangles
    #[arg(short, long)]
    recombine: bool,

    /// One physical surface per boundary surface instead of six side groups
    #[arg(short, long)]
    all_boundaries: bool,

    /// Also save the built scene as a binary document
    #[arg(long, value_name = "PATH")]
    binary: Option<String>,

    /// Validate the input and log statistics without writing output
    #[arg(long)]
    check: bool,

    /// Additional include search directories
    #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
    include_dirs: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let input = Utf8PathBuf::from(&cli.input);
    let base_dir = input
        .parent()
        .map(|p| p.to_owned())
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    let mut search_dirs = vec![base_dir.clone()];
    search_dirs.extend(cli.include_dirs.iter().map(Utf8PathBuf::from));
    let resolver = IncludeResolver::new(&search_dirs);
    let mut parser = InputParser::with_resolver(&base_dir, FsSource, resolver);

    info!("Parsing {}", input);
    let mut root = parser
        .parse_input_file(&input)
        .with_context(|| format!("Failed to parse {}", input))?;
    info!("{} blocks", root.count_blocks());

    info!("Transforming");
    root.transform(&[], None)?;

    info!("Registering");
    let mut registry = Registry::new();
    root.register(&mut registry)?;
    root.unregister(&mut registry);
    if cli.recombine {
        registry.recombine_all_surfaces();
    }
    info!("{}", registry.stats());

    if cli.check {
        return Ok(());
    }

    let model_name = input.file_stem().unwrap_or("model").to_string();
    let script = generate_geo_script(
        &registry,
        &GeoOptions {
            model_name,
            all_boundaries: cli.all_boundaries,
        },
    );
    let output = cli.output.map(Utf8PathBuf::from).unwrap_or_else(|| {
        let mut p = input.clone();
        p.set_extension("geo");
        p
    });
    std::fs::write(output.as_std_path(), &script)
        .with_context(|| format!("Failed to write {}", output))?;
    info!("Wrote {}", output);

    if let Some(binary) = cli.binary {
        GeoDoc { registry }.save_to_binary(&binary)?;
        info!("Wrote {}", binary);
    }
    Ok(())
}
