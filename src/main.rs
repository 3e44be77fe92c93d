use book_manager::configs::{self, Backend};
use book_manager::format;
use book_manager::item::repo;
use book_manager::shell::stdin::InterruptibleInput;
use book_manager::shell::{Options, Shell};
use clap::Parser;
use std::io;
use std::process::ExitCode;
use tracing::{error, info};

/// Terminal book inventory manager
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Storage backend. Overrides `backend` of the config file
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    /// Print with a fixed width instead of the terminal width
    #[arg(long)]
    fixed_width: bool,

    /// Stretch search result columns to the output width
    #[arg(long)]
    adaptive_table: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    configs::load_dotenv();
    let config = match configs::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format::error(&format!("Cannot load config: {}", e)));
            return ExitCode::FAILURE;
        }
    };
    let config = match cli.backend {
        Some(backend) => config.with_backend(backend),
        None => config,
    };

    // 가드가 drop 되면 파일 로그가 기록되지 않는다.
    let _guard = match configs::set_global_logging_config(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", format::error(&format!("Cannot initialize logging: {}", e)));
            return ExitCode::FAILURE;
        }
    };

    info!("Book manager started with {:?} backend", config.backend());
    let repository = match repo::connect(&config) {
        Ok(repository) => repository,
        Err(e) => {
            error!("Cannot connect to {:?} backend: {}", config.backend(), e);
            eprintln!("{}", format::styled(
                &format!("Cannot connect to the {:?} database. Please check that the server is running.\n{}", config.backend(), e),
                &[format::Style::Bold, format::Style::Error]
            ));
            return ExitCode::FAILURE;
        }
    };

    let options = Options {
        width: if cli.fixed_width { format::DEFAULT_WIDTH } else { format::terminal_width() },
        adaptive_table: cli.adaptive_table,
    };

    let input = match InterruptibleInput::stdin() {
        Ok(input) => input,
        Err(e) => {
            error!("Cannot watch interrupt signal: {}", e);
            eprintln!("{}", format::error(&format!("Cannot watch interrupt signal: {}", e)));
            repository.close();
            return ExitCode::FAILURE;
        }
    };

    let result = Shell::new(repository.as_ref(), input, io::stdout(), options).run();
    repository.close();

    match result {
        Ok(()) => {
            info!("Book manager exited");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Shell stopped: {}", e);
            eprintln!("{}", format::error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}
