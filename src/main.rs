use getopts::Options;
use rustyline::error::ReadlineError;
use sforth::core::VM;
use std::env;
use std::process;

const DEFAULT_DATA_PAGES: usize = 16;
const DEFAULT_CODE_PAGES: usize = 16;

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();
    let mut opts = Options::new();
    opts.optflag("h", "help", "print help menu");
    opts.optflag("v", "version", "print version number");
    opts.optopt("", "data-pages", "pages of variable storage", "N");
    opts.optopt("", "code-pages", "pages of compiled-code storage", "N");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            eprintln!("{}", f);
            process::exit(2);
        }
    };
    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return;
    }
    if matches.opt_present("v") {
        print_version();
        return;
    }

    let data_pages = pages(&matches, "data-pages", DEFAULT_DATA_PAGES);
    let code_pages = pages(&matches, "code-pages", DEFAULT_CODE_PAGES);

    let vm = &mut VM::new(data_pages, code_pages);
    vm.begin();
    vm.flush();
    repl(vm);
}

fn pages(matches: &getopts::Matches, name: &str, default: usize) -> usize {
    matches
        .opt_str(name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn repl(vm: &mut VM) {
    let mut rl = match rustyline::DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    loop {
        match rl.readline("SForth> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                vm.evaluate(&line);
                vm.flush();
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => {
                eprintln!("{}", e);
                break;
            }
        }
    }
}

fn print_version() {
    println!("SForth v{}", env!("CARGO_PKG_VERSION"));
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}
