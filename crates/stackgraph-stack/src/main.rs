use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use stackgraph_stack::{bind_plan, synthesize, OutputFormat, StackConfig, DEFAULT_STACK_NAME};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn stack_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("stack")
                .long("stack")
                .default_value(DEFAULT_STACK_NAME)
                .help("Stack name"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML or YAML configuration file"),
        )
}

fn cli() -> Command {
    Command::new("stackgraph")
        .version(stackgraph_stack::VERSION)
        .about("Synthesize the log delivery stack into a deployment template")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            stack_args(Command::new("synth").about("Build, synthesize and print the template"))
                .arg(
                    Arg::new("format")
                        .long("format")
                        .default_value("json")
                        .value_parser(OutputFormat::NAMES)
                        .help("Template format"),
                )
                .arg(
                    Arg::new("require-bound")
                        .long("require-bound")
                        .action(ArgAction::SetTrue)
                        .help("Fail if any deferred binding is left unresolved"),
                ),
        )
        .subcommand(
            stack_args(Command::new("plan").about("Print the realization order and fingerprint"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(Command::new("schema").about("Print the configuration JSON Schema"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    // Logs go to stderr so stdout carries only the template
    let _ = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}

fn load_config(args: &ArgMatches) -> anyhow::Result<StackConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => StackConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(StackConfig::default()),
    }
}

fn stack_name(args: &ArgMatches) -> &str {
    args.get_one::<String>("stack")
        .map_or(DEFAULT_STACK_NAME, String::as_str)
}

fn run_synth(args: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let format = args
        .get_one::<String>("format")
        .map_or(Ok(OutputFormat::Json), |name| name.parse())
        .map_err(anyhow::Error::msg)?;

    let plan = synthesize(stack_name(args), &config)?;
    let bindings = config.bindings_with_env(std::env::vars());
    let bound = bind_plan(&plan, &bindings, args.get_flag("require-bound"))?;

    println!("{}", format.render(&bound.to_template())?);
    Ok(())
}

fn run_plan(args: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let plan = synthesize(stack_name(args), &config)?;
    let summary = plan.summary();

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Stack: {}", summary.stack);
    println!("Fingerprint: {}", summary.fingerprint);
    println!();
    for step in &summary.steps {
        let depends_on: Vec<_> = step.depends_on.iter().map(ToString::to_string).collect();
        if depends_on.is_empty() {
            println!("  {:>2}. {:<16} {}", step.position, step.resource_type, step.logical_id);
        } else {
            println!(
                "  {:>2}. {:<16} {} (after {})",
                step.position,
                step.resource_type,
                step.logical_id,
                depends_on.join(", ")
            );
        }
    }
    if !summary.unresolved_tokens.is_empty() {
        println!();
        let tokens: Vec<_> = summary.unresolved_tokens.iter().map(String::as_str).collect();
        println!("Deferred bindings: {}", tokens.join(", "));
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("synth", args)) => run_synth(args),
        Some(("plan", args)) => run_plan(args),
        Some(("schema", _)) => {
            println!("{}", serde_json::to_string_pretty(&StackConfig::schema())?);
            Ok(())
        }
        _ => Ok(()),
    }
}
