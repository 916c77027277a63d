//! csvmap CLI - Map CSV files to JSON, YAML or TOML documents
//!
//! # Commands
//!
//! ```bash
//! csvmap map -c mapping.json -i input.csv          # Map CSV using a configuration
//! csvmap split -c groups.json -i input.json        # Split a JSON array into groups
//! csvmap example-config                            # Show an example configuration
//! csvmap kinds                                     # Show calculated field kinds
//! ```

use clap::{Parser, Subcommand};
use csv::StringRecord;
use csvmap::{
    example_configuration, kinds_description, BoxError, CalculatedField, ConsoleObserver,
    InputEncoding, LogLevel, MapperBuilder, SplitConfiguration, Splitter,
};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Path value meaning stdin or stdout
const STDIO: &str = "-";

#[derive(Parser)]
#[command(name = "csvmap")]
#[command(about = "Map CSV files to JSON, YAML or TOML documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a CSV file using a mapping configuration
    Map {
        /// Mapping configuration (JSON)
        #[arg(short, long)]
        configuration_file: PathBuf,

        /// CSV separator, exactly one character
        #[arg(short, long, default_value = ";")]
        separator: String,

        /// Output type: json, yaml or toml
        #[arg(short, long, default_value = "json")]
        output_type: String,

        /// Wrap the records array under this property
        #[arg(short, long, default_value = "")]
        nested_property_name: String,

        /// Emit one array instead of one document per record
        #[arg(short, long)]
        generate_array: bool,

        /// First row is a header, columns are referenced by name
        #[arg(short, long)]
        access_by_header: bool,

        /// Input file, - for stdin
        #[arg(short, long, default_value = STDIO)]
        input_file: PathBuf,

        /// Output file, - for stdout
        #[arg(long, default_value = STDIO)]
        output_file: PathBuf,

        /// Input encoding: utf-8, auto or an encoding label (latin1, windows-1252, ...)
        #[arg(short, long, default_value = "utf-8")]
        encoding: String,

        /// Answer ask fields on the terminal
        #[arg(long)]
        interactive: bool,

        /// Print debug logs to stderr
        #[arg(short, long)]
        debug: bool,
    },

    /// Split a JSON array into groups of matching elements
    Split {
        /// Groups configuration (JSON)
        #[arg(short, long)]
        configuration_file: PathBuf,

        /// Dotted path of the array inside the input
        #[arg(short, long, default_value = "")]
        array_path: String,

        /// Also output groups without members
        #[arg(long)]
        output_empty_groups: bool,

        /// Input file, - for stdin
        #[arg(short, long, default_value = STDIO)]
        input_file: PathBuf,

        /// Output file, - for stdout
        #[arg(short, long, default_value = STDIO)]
        output_file: PathBuf,

        /// Print debug logs to stderr
        #[arg(short, long)]
        debug: bool,
    },

    /// Show example mapping configuration
    ExampleConfig,

    /// Show available calculated field kinds
    Kinds,
}

/// Options of the map command
struct MapOptions {
    configuration_file: PathBuf,
    separator: String,
    output_type: String,
    nested_property_name: String,
    generate_array: bool,
    access_by_header: bool,
    input_file: PathBuf,
    output_file: PathBuf,
    encoding: String,
    interactive: bool,
    debug: bool,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Map {
            configuration_file,
            separator,
            output_type,
            nested_property_name,
            generate_array,
            access_by_header,
            input_file,
            output_file,
            encoding,
            interactive,
            debug,
        } => cmd_map(MapOptions {
            configuration_file,
            separator,
            output_type,
            nested_property_name,
            generate_array,
            access_by_header,
            input_file,
            output_file,
            encoding,
            interactive,
            debug,
        }),

        Commands::Split {
            configuration_file,
            array_path,
            output_empty_groups,
            input_file,
            output_file,
            debug,
        } => cmd_split(
            &configuration_file,
            &array_path,
            output_empty_groups,
            &input_file,
            &output_file,
            debug,
        ),

        Commands::ExampleConfig => cmd_example_config(),

        Commands::Kinds => cmd_kinds(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_map(options: MapOptions) -> Result<(), Box<dyn std::error::Error>> {
    if options.interactive && is_stdio(&options.input_file) {
        return Err("interactive mode needs --input-file, stdin is used for answers".into());
    }

    let configuration = fs::read(&options.configuration_file)?;
    let mut builder = MapperBuilder::from_json(&configuration)
        .separator(&options.separator)
        .output_type(&options.output_type)
        .nested_property_name(&options.nested_property_name)
        .generate_array(options.generate_array)
        .access_by_header(options.access_by_header)
        .encoding(InputEncoding::parse(&options.encoding)?)
        .observer(Arc::new(ConsoleObserver::new(log_level(options.debug))));
    if options.interactive {
        builder = builder.ask(ask_on_terminal);
    }
    let mut mapper = builder.build()?;

    eprintln!("📄 Mapping CSV: {}", describe(&options.input_file, "stdin"));
    let summary = {
        let reader = open_input(&options.input_file)?;
        let writer = open_output(&options.output_file)?;
        mapper.map_io(reader, writer)?
    };
    eprintln!(
        "✅ Mapped {} records as {} ({} rows read, {} filtered)",
        summary.emitted,
        mapper.content_type(),
        summary.rows_read,
        summary.filtered
    );
    if !is_stdio(&options.output_file) {
        eprintln!("💾 Output written to: {}", options.output_file.display());
    }

    Ok(())
}

fn cmd_split(
    configuration_file: &Path,
    array_path: &str,
    output_empty_groups: bool,
    input_file: &Path,
    output_file: &Path,
    debug: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let configuration = SplitConfiguration::from_json(&fs::read(configuration_file)?)?;
    let splitter = Splitter::new(configuration)
        .array_path(array_path)
        .output_empty_groups(output_empty_groups)
        .observer(Arc::new(ConsoleObserver::new(log_level(debug))));

    let mut input = Vec::new();
    open_input(input_file)?.read_to_end(&mut input)?;

    let groups = splitter.split(&input)?;
    eprintln!("✅ Split into {} groups", groups.len());

    let json = serde_json::to_string_pretty(&groups)?;
    let mut writer = open_output(output_file)?;
    writeln!(writer, "{}", json)?;
    writer.flush()?;

    Ok(())
}

fn cmd_example_config() -> Result<(), Box<dyn std::error::Error>> {
    let configuration = example_configuration();
    println!("{}", configuration.to_json()?);
    Ok(())
}

fn cmd_kinds() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", kinds_description());
    Ok(())
}

fn log_level(debug: bool) -> LogLevel {
    if debug {
        LogLevel::Debug
    } else {
        LogLevel::Warning
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO
}

fn describe(path: &Path, stdio: &str) -> String {
    if is_stdio(path) {
        stdio.to_string()
    } else {
        path.display().to_string()
    }
}

fn open_input(path: &Path) -> io::Result<Box<dyn Read>> {
    if is_stdio(path) {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

fn open_output(path: &Path) -> io::Result<Box<dyn Write>> {
    if is_stdio(path) {
        Ok(Box::new(BufWriter::new(io::stdout().lock())))
    } else {
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}

/// Prompt on stderr and read the answer from stdin
fn ask_on_terminal(
    record: Option<&StringRecord>,
    _header: Option<&StringRecord>,
    field: &CalculatedField,
) -> Result<String, BoxError> {
    let mut stderr = io::stderr();
    if let Some(record) = record {
        writeln!(stderr, "   record: {}", record.iter().collect::<Vec<_>>().join(", "))?;
    }
    write!(stderr, "❓ {} [{}]: ", field.format, field.property)?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.trim_end_matches(['\r', '\n']).to_string())
}
