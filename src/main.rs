use liber_console::RunOptions;

enum Mode {
    Console,
    Status,
    Lore,
    Exit,
}

fn main() {
    let mut opts = RunOptions::default();
    let mode = match parse_args(std::env::args().skip(1), &mut opts) {
        Ok(mode) => mode,
        Err(message) => {
            eprintln!("error: {message}\n\nRun with --help for usage.");
            std::process::exit(2);
        }
    };

    let result = match mode {
        Mode::Exit => return,
        Mode::Console => liber_console::run(opts),
        Mode::Status => print_status(&opts),
        Mode::Lore => print_lore(&opts),
    };
    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(mut args: impl Iterator<Item = String>, opts: &mut RunOptions) -> Result<Mode, String> {
    let mut mode = Mode::Console;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Liber Console {}", liber_console::VERSION);
                return Ok(Mode::Exit);
            }
            "--help" | "-h" => {
                println!(
                    "Liber Console — House Liber Arce staff console for the terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n  --status             Probe the content service and print its health\n  --lore               List the lore-only sections and exit\n  --channel <id>       Open this channel on start\n  --offline            Use the built-in sample store instead of the network\n\nThe content service URL comes from the config file or LIBER_CONTENT__BASE_URL."
                );
                return Ok(Mode::Exit);
            }
            "--status" => mode = Mode::Status,
            "--lore" => mode = Mode::Lore,
            "--offline" => opts.offline = true,
            "--channel" => match args.next() {
                Some(id) if !id.starts_with("--") => opts.channel = Some(id),
                _ => return Err("--channel needs a channel id".to_string()),
            },
            other => {
                if let Some(id) = other.strip_prefix("--channel=") {
                    opts.channel = Some(id.to_string());
                } else {
                    return Err(format!("unknown argument: {other}"));
                }
            }
        }
    }
    Ok(mode)
}

fn print_status(opts: &RunOptions) -> anyhow::Result<()> {
    let health = liber_console::app::check_status(opts)?;
    if health.is_up() {
        println!("{}", health.render());
        Ok(())
    } else {
        eprintln!("{}", health.render());
        std::process::exit(1);
    }
}

fn print_lore(opts: &RunOptions) -> anyhow::Result<()> {
    let sections = liber_console::app::lore_sections(opts)?;
    if sections.is_empty() {
        println!("No lore sections.");
    }
    for section in sections {
        println!("{} ({})", section.name, section.id);
    }
    Ok(())
}
