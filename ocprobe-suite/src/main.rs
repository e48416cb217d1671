//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use clap::{App, Arg};
use ocprobe_sim::SimTestbed;
use ocprobe_suite::config::{
    Config, Logging, LoggingFile, LoggingFileRotation, LoggingFmt,
    LoggingFmtStyle,
};
use ocprobe_suite::runner::{self, CASES};
use tracing::{Subscriber, error, info};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

fn init_tracing(config: &Logging) {
    let file = config
        .file
        .enabled
        .then(|| fmt_layer(&config.file.fmt, file_appender(&config.file)));
    let stdout = config
        .stdout
        .enabled
        .then(|| fmt_layer(&config.stdout.fmt, std::io::stdout));

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ocprobe=debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(file)
        .with(stdout)
        .init();
}

fn file_appender(config: &LoggingFile) -> RollingFileAppender {
    match config.rotation {
        LoggingFileRotation::Never => rolling::never(&config.dir, &config.name),
        LoggingFileRotation::Hourly => {
            rolling::hourly(&config.dir, &config.name)
        }
        LoggingFileRotation::Daily => rolling::daily(&config.dir, &config.name),
    }
}

fn fmt_layer<S, W>(
    fmt: &LoggingFmt,
    writer: W,
) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_thread_ids(fmt.show_thread_id)
        .with_file(fmt.show_source)
        .with_line_number(fmt.show_source)
        .with_ansi(fmt.colors);
    match fmt.style {
        LoggingFmtStyle::Compact => layer.compact().boxed(),
        LoggingFmtStyle::Full => layer.boxed(),
        LoggingFmtStyle::Json => layer.json().boxed(),
        LoggingFmtStyle::Pretty => layer.pretty().boxed(),
    }
}

fn build_version() -> String {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    match rustc_tools_util::get_version_info!().commit_hash {
        Some(hash) => format!("{VERSION} ({hash})"),
        None => VERSION.to_owned(),
    }
}

// ===== main =====

fn main() {
    // Parse command-line parameters.
    let version = build_version();
    let matches = App::new("OpenConfig conformance probe")
        .version(version.as_str())
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify an alternative configuration file."),
        )
        .arg(
            Arg::with_name("case")
                .long("case")
                .value_name("name")
                .multiple(true)
                .number_of_values(1)
                .help("Run only the given case. May be repeated."),
        )
        .arg(
            Arg::with_name("list")
                .long("list")
                .help("List the available cases and exit."),
        )
        .get_matches();

    if matches.is_present("list") {
        for case in &CASES {
            println!("{:<40} {}", case.name, case.description);
        }
        return;
    }

    // Read configuration file.
    let config_file = matches.value_of("config");
    let config = match Config::load(config_file) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Invalid configuration file: {error}");
            std::process::exit(1);
        }
    };

    // Initialize tracing.
    init_tracing(&config.logging);

    // Command-line case selection takes precedence over the configuration.
    let names = match matches.values_of("case") {
        Some(values) => values.map(str::to_owned).collect::<Vec<_>>(),
        None => config.cases.enabled.clone(),
    };
    let cases = match runner::select(&names) {
        Ok(cases) => cases,
        Err(error) => {
            error!(%error, "invalid case selection");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            error!(%error, "failed to build tokio runtime");
            std::process::exit(1);
        }
    };

    info!(version = %version, cases = cases.len(), "starting up");
    let report = runtime.block_on(async {
        let sim = SimTestbed::new(config.sim.clone());
        runner::run(&sim.testbed(), &config, &cases).await
    });

    println!("{report}");
    if !report.success() {
        std::process::exit(1);
    }
}
