//! Kotlin playground compiler CLI
//!
//! Prints one JSON response per invocation on stdout; diagnostics go to
//! stderr.

use kplay_analysis::Environment;
use kplayc::cli::{
    emit_diagnostics, execute, execute_batch, load_request, parse_args, read_batch, to_json, usage,
    CliError, Invocation, Response,
};
use kplayc::{init_tracing, ProjectExecutor, WorkerPool};

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            eprint!("{}", usage());
            std::process::exit(2);
        }
    };

    if invocation == Invocation::Help {
        print!("{}", usage());
        return;
    }

    let env = match Environment::global() {
        Ok(env) => env,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };
    let executor = ProjectExecutor::new(env);

    let ok = match invocation {
        Invocation::Help => true,
        Invocation::Version => print_json(&Response::Version(executor.version())),
        Invocation::Execute(options) => match load_request(&options) {
            Ok(request) => {
                let response = execute(&executor, &request);
                emit_diagnostics(&response, options.color);
                print_json(&response) && response.is_ok()
            }
            Err(err) => fail(&err),
        },
        Invocation::Batch { path, color } => match read_batch(&path) {
            Ok(requests) => {
                let pool = WorkerPool::from_environment(env);
                let responses = execute_batch(&executor, &pool, &requests);
                for response in &responses {
                    emit_diagnostics(response, color);
                }
                print_json(&responses) && responses.iter().all(Response::is_ok)
            }
            Err(err) => fail(&err),
        },
    };

    if !ok {
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) -> bool {
    match to_json(value) {
        Ok(json) => {
            println!("{json}");
            true
        }
        Err(err) => fail(&err),
    }
}

fn fail(err: &CliError) -> bool {
    eprintln!("error: {err}");
    false
}
