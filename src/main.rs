fn run() -> anyhow::Result<()> {
    qforge::cli::Cli::init()?.execute()
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}
