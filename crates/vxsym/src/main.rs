use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use vxsym_core::kernel::fix_netpool;
use vxsym_core::symbols::{WalkReport, define_symbol_table, is_symbol_table, walk};
use vxsym_core::types::{Address, Endian, PoolInfo, TcbInfo};
use vxsym_core::{AnalysisConfig, FirmwareImage, ItaniumDemangler, VxError, VxVersion, fix_tcb};
use vxsym_utils::{LogFormat, LogGuard, LogLevel, LoggingError, error, info, init_logging, init_logging_to_dir, init_logging_with_level, warn};

/// Recover symbols and kernel objects from VxWorks firmware images.
#[derive(Parser, Debug)]
#[command(name = "vxsym")]
#[command(version)]
#[command(about = "Recover symbols and kernel objects from VxWorks firmware images", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    /// Log format: pretty or json (overrides VXSYM_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
    /// Write logs to a dated file in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Where the firmware is and how to read it.
#[derive(Args, Debug)]
struct ImageArgs
{
    /// Raw firmware image
    firmware: PathBuf,
    /// Address the image is loaded at (hex 0x... or decimal)
    #[arg(short = 'l', long, value_parser = parse_address, default_value = "0")]
    load_address: Address,
    /// VxWorks major version: 5, 6 or 7
    #[arg(long = "vx-version", default_value = "5")]
    vx_version: VxVersion,
    /// Byte order: big or little
    #[arg(short, long, default_value = "big")]
    endian: Endian,
}

impl ImageArgs
{
    fn config(&self) -> AnalysisConfig
    {
        AnalysisConfig::new(self.vx_version)
            .with_endian(self.endian)
            .with_load_address(self.load_address)
            .apply_env()
    }

    fn load(&self, config: &AnalysisConfig) -> vxsym_core::Result<FirmwareImage>
    {
        FirmwareImage::load(&self.firmware, config.load_address, config.endian)
    }
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Check whether a file is an exported VxWorks symbol table
    Check
    {
        /// Candidate symbol table file
        table: PathBuf,
        /// Byte order: big or little
        #[arg(short, long, default_value = "big")]
        endian: Endian,
    },
    /// Walk the symbol table and name functions and data
    Symbols
    {
        #[command(flatten)]
        image: ImageArgs,
        /// First address of the symbol table
        #[arg(long, value_parser = parse_address)]
        table_start: Address,
        /// One past the last address of the symbol table
        #[arg(long, value_parser = parse_address)]
        table_end: Option<Address>,
        /// Symbol table extracted to its own file, mapped at --table-start
        #[arg(long)]
        symbol_file: Option<PathBuf>,
        /// Record to start walking from (default: last record of the table)
        #[arg(long, value_parser = parse_address)]
        head: Option<Address>,
        /// Record to stop at (default: --table-start)
        #[arg(long, value_parser = parse_address)]
        tail: Option<Address>,
        /// Stop after this many records
        #[arg(long)]
        max_symbols: Option<usize>,
        /// Print every recovered symbol, not only the summary
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },
    /// Recover a network buffer pool (NET_POOL) and its cluster pools
    Netpool
    {
        #[command(flatten)]
        image: ImageArgs,
        /// Address of the NET_POOL
        #[arg(value_parser = parse_address)]
        address: Address,
    },
    /// Recover task control blocks (WIND_TCB)
    Tcb
    {
        #[command(flatten)]
        image: ImageArgs,
        /// Addresses of the TCBs
        #[arg(value_parser = parse_address, required = true)]
        addresses: Vec<Address>,
    },
}

fn parse_address(s: &str) -> Result<Address, String>
{
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map(Address::new).map_err(|e| format!("invalid address '{s}': {e}"))
}

fn init_cli_logging(cli: &Cli) -> Result<LogGuard, LoggingError>
{
    let format = cli.log_format.unwrap_or_default();
    match (&cli.log_dir, cli.log_level) {
        (Some(dir), level) => {
            let (path, guard) = init_logging_to_dir(dir, level, format)?;
            eprintln!("Logging to {}", path.display());
            Ok(guard)
        }
        (None, Some(level)) => init_logging_with_level(level, format),
        (None, None) => init_logging(),
    }
}

fn main() -> ExitCode
{
    let cli = Cli::parse();

    let _guard = match init_cli_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run_command(cli.command) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_command(command: Commands) -> Result<ExitCode, Box<dyn std::error::Error>>
{
    match command {
        Commands::Check { table, endian } => {
            let bytes = fs::read(&table)?;
            if is_symbol_table(&bytes, endian) {
                println!("{}: VxWorks symbol table ({} bytes, {endian} endian)", table.display(), bytes.len());
                Ok(ExitCode::SUCCESS)
            } else {
                println!("{}: not a VxWorks symbol table ({endian} endian)", table.display());
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Symbols {
            image,
            table_start,
            table_end,
            symbol_file,
            head,
            tail,
            max_symbols,
            verbose,
        } => {
            let mut config = image.config();
            if let Some(max) = max_symbols {
                config = config.with_max_symbols(max);
            }
            let mut firmware = image.load(&config)?;

            let table_data = symbol_file.as_deref().map(read_symbol_file).transpose()?;
            if let Some(data) = &table_data {
                if !is_symbol_table(data, config.endian) {
                    warn!("symbol file does not look like a VxWorks symbol table, walking it anyway");
                }
            }

            let table_end = match (table_end, &table_data) {
                (Some(end), _) => end,
                (None, Some(data)) => table_start + data.len() as u64,
                (None, None) => {
                    return Err(VxError::InvalidArgument("--table-end is required without --symbol-file".to_string()).into());
                }
            };

            define_symbol_table(
                &mut firmware,
                table_start,
                table_end,
                table_data.as_deref().unwrap_or_default(),
                config.version,
            )?;

            let stride = config.version.symbol_layout().stride;
            let head = head.unwrap_or_else(|| last_record(table_start, table_end, stride));
            let tail = tail.unwrap_or(table_start);

            let report = walk(&mut firmware, &ItaniumDemangler::new(), head, tail, &config);
            print_walk_report(&report, verbose);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Netpool { image, address } => {
            let config = image.config();
            let mut firmware = image.load(&config)?;
            let pool = fix_netpool(&mut firmware, address, &config)?;
            print_pool_info(&pool);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Tcb { image, addresses } => {
            let config = image.config();
            let mut firmware = image.load(&config)?;
            for address in addresses {
                let tcb = fix_tcb(&mut firmware, address, &config)?;
                print_tcb_info(&tcb);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_symbol_file(path: &Path) -> Result<Vec<u8>, VxError>
{
    let data = fs::read(path)?;
    info!(path = %path.display(), len = data.len(), "read symbol file");
    Ok(data)
}

/// Start of the last whole record in `[start, end)`.
fn last_record(start: Address, end: Address, stride: u64) -> Address
{
    let span = end.offset_from(start).unwrap_or_default();
    let count = span / stride;
    start + count.saturating_sub(1) * stride
}

fn print_walk_report(report: &WalkReport, verbose: bool)
{
    println!("{} symbol table", report.version);
    println!("  Records:   {}", report.records);
    println!("  Functions: {}", report.function_count());
    println!("  Labels:    {}", report.label_count());
    println!("  Failures:  {}", report.failures.len());
    println!("  Stopped:   {}", report.stop);

    if verbose {
        println!();
        for symbol in &report.symbols {
            match &symbol.demangled {
                Some(sig) => println!("{}  {:<8}  {}  ; {sig}", symbol.address, symbol.kind, symbol.name),
                None => println!("{}  {:<8}  {}", symbol.address, symbol.kind, symbol.name),
            }
        }
        for failure in &report.failures {
            println!("{}  failed    {}", failure.address, failure.source);
        }
    }
}

fn print_pool_info(pool: &PoolInfo)
{
    println!("NET_POOL at {}", pool.pool_addr);
    println!("  clTbl:     {}", pool.pool_table_addr);
    println!("  pPoolStat: {}", pool.pool_status_addr);
    println!("  pFuncTbl:  {}", pool.pool_func_tbl_addr);
    for cl_pool in &pool.cl_pool_info {
        println!(
            "  CL_POOL {}: size {} num {} free {} usage {} head {} ({} buffers)",
            cl_pool.cl_pool_addr,
            cl_pool.cl_pool_size,
            cl_pool.cl_pool_num,
            cl_pool.cl_pool_num_free,
            cl_pool.cl_pool_usage,
            cl_pool.cl_head_addr,
            cl_pool.buffers.len()
        );
    }
    for function in &pool.pool_functions {
        let how = if function.created { "function" } else { "label" };
        println!("  {:<16} {} ({how})", function.name, function.address);
    }
}

fn print_tcb_info(tcb: &TcbInfo)
{
    println!("WIND_TCB at {}", tcb.tcb_addr);
    println!("  Name:        {} ({})", tcb.task_name.as_deref().unwrap_or("?"), tcb.task_name_addr);
    println!(
        "  Entry:       {} ({})",
        tcb.task_entry_name.as_deref().unwrap_or("?"),
        tcb.task_entry_addr
    );
    println!("  Stack base:  {}", tcb.task_stack_base);
    println!("  Stack limit: {}", tcb.task_stack_limit);
    println!("  Stack end:   {}", tcb.task_stack_limit_end);
    println!("  Stack size:  {:#x}", tcb.stack_size());
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_address()
    {
        assert_eq!(parse_address("0x10000").unwrap(), Address::new(0x10000));
        assert_eq!(parse_address("4096").unwrap(), Address::new(4096));
        assert!(parse_address("0xzz").is_err());
    }

    #[test]
    fn test_last_record()
    {
        assert_eq!(last_record(Address::new(0x100), Address::new(0x140), 0x10), Address::new(0x130));
        assert_eq!(last_record(Address::new(0x100), Address::new(0x148), 0x10), Address::new(0x130));
        assert_eq!(last_record(Address::new(0x100), Address::new(0x100), 0x10), Address::new(0x100));
    }

    #[test]
    fn test_cli_parses_symbols_command()
    {
        let cli = Cli::try_parse_from([
            "vxsym",
            "symbols",
            "fw.bin",
            "--load-address",
            "0x10000",
            "--vx-version",
            "6",
            "--table-start",
            "0x20000",
            "--table-end",
            "0x20140",
        ])
        .unwrap();
        match cli.command {
            Commands::Symbols { image, table_start, .. } => {
                assert_eq!(image.vx_version, VxVersion::V6);
                assert_eq!(image.load_address, Address::new(0x10000));
                assert_eq!(table_start, Address::new(0x20000));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
