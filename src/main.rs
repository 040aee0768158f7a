use boardlog::cli::{print_error, Cli};

fn main() {
    // Initialize CLI and execute command
    if let Err(e) = Cli::run() {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
