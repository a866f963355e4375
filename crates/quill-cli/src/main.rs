use std::{env, path::Path, process::ExitCode, time::Instant};

use quill::{
    Identifier, Number, Pool, RunProgress, Session, StderrTracer, Type, Value, compile_file,
    new_default_environment, new_external_function,
};

/// When set, registers a demo external function `add_numbers` and resumes
/// across its calls, mirroring how an embedding host would drive a script.
const EXT_FUNCTIONS: bool = false;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let mut trace = false;
    let mut file_path = None;
    for arg in &args[1..] {
        if arg == "--trace" {
            trace = true;
        } else {
            file_path = Some(arg.clone());
        }
    }
    let Some(file_path) = file_path else {
        eprintln!("usage: quill [--trace] FILE");
        return ExitCode::FAILURE;
    };

    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    if EXT_FUNCTIONS {
        environment.value().define(
            Identifier::new("add_numbers"),
            &new_external_function(
                &pool,
                Identifier::new("add_numbers"),
                Type::Number,
                vec![Type::Number, Type::Number],
            ),
        );
    }

    let start = Instant::now();
    let program = match compile_file(Path::new(&file_path), &pool, environment.clone()) {
        Ok(program) => program,
        Err(errors) => {
            eprintln!("error:\n{errors}");
            return ExitCode::FAILURE;
        }
    };
    eprintln!("time taken to compile: {:?}", start.elapsed());

    let mut session = Session::new(program, &pool, environment);
    if trace {
        session = session.with_tracer(Box::new(StderrTracer::default()));
    }

    let start = Instant::now();
    let mut progress = match session.start() {
        Ok(progress) => progress,
        Err(error) => {
            eprintln!("error after {:?}:\n{error}", start.elapsed());
            return ExitCode::FAILURE;
        }
    };

    loop {
        match progress {
            RunProgress::Complete(value) => {
                let stats = pool.full_collect();
                eprintln!("success after {:?} ({stats})", start.elapsed());
                println!("{}", value.value());
                return ExitCode::SUCCESS;
            }
            RunProgress::ExternalCall {
                name, args, state, ..
            } => {
                if name.as_str() != "add_numbers" || args.len() != 2 {
                    eprintln!("unknown external function: {name}");
                    return ExitCode::FAILURE;
                }
                let result: Number = match (
                    args[0].value().as_number(),
                    args[1].value().as_number(),
                ) {
                    (Ok(a), Ok(b)) => a + b,
                    _ => {
                        eprintln!("add_numbers requires number arguments");
                        return ExitCode::FAILURE;
                    }
                };
                eprintln!("external call: {name}(..) -> {result}");
                progress = match state.resume(Value::new_number(&pool, result)) {
                    Ok(progress) => progress,
                    Err(error) => {
                        eprintln!("error: {error}");
                        return ExitCode::FAILURE;
                    }
                };
            }
        }
    }
}
