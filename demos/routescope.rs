// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use routescope::{
    Declaration, EnvSource, HandlerRegistry, MapEnv, Module, ProcessEnv, ScopeTree, Value, View,
};

// `pkg.views:index,detail` registers views `index` and `detail` in module `pkg.views`.
fn parse_module(spec: &str) -> Result<Module> {
    let Some((path, attrs)) = spec.split_once(':') else {
        bail!("invalid module `{spec}`, expected path:attr[,attr...]");
    };
    let mut module = Module::new(path);
    for attr in attrs.split(',').filter(|a| !a.is_empty()) {
        let name = format!("{path}.{attr}");
        let response = Value::from(name.as_str());
        module.insert(attr, View::new(name, move |_| Ok(response.clone())));
    }
    Ok(module)
}

fn parse_env(vars: &[String]) -> Result<MapEnv> {
    vars.iter()
        .map(|v| {
            v.split_once('=')
                .ok_or_else(|| anyhow!("invalid variable `{v}`, expected KEY=VALUE"))
        })
        .collect()
}

fn build(file: &str, modules: &[String], env: &[String], process_env: bool) -> Result<ScopeTree> {
    let registry = HandlerRegistry::new();
    for spec in modules {
        registry.register(parse_module(spec)?)?;
    }

    let declaration =
        Declaration::from_file(file).with_context(|| format!("Failed to load {file}"))?;

    let map_env;
    let env: &dyn EnvSource = if process_env {
        &ProcessEnv
    } else {
        map_env = parse_env(env)?;
        &map_env
    };
    declaration.build(Rc::new(registry), env)
}

fn urls(file: &str, modules: &[String], env: &[String], process_env: bool) -> Result<()> {
    let tree = build(file, modules, env, process_env)?;
    let entries: Vec<_> = tree.entries().collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn check(file: &str, modules: &[String], env: &[String], process_env: bool) -> Result<()> {
    let tree = build(file, modules, env, process_env)?;
    let mut count = 0;
    for entry in tree.entries() {
        entry.compile_pattern()?;
        count += 1;
    }
    println!("{count} entries ok");
    Ok(())
}

#[derive(Subcommand)]
enum RouteScopeCommand {
    /// Print the flattened entries of a declaration as json.
    Urls {
        /// Declaration file (json or yaml).
        #[arg(required(true), value_name = "declaration.yaml")]
        file: String,

        /// Module with placeholder views, as path:attr[,attr...].
        #[arg(long, short)]
        module: Vec<String>,

        /// Environment variable, as KEY=VALUE.
        #[arg(long, short)]
        env: Vec<String>,

        /// Read environment variables from the process instead.
        #[arg(long)]
        process_env: bool,
    },

    /// Build a declaration and compile every pattern.
    Check {
        /// Declaration file (json or yaml).
        #[arg(required(true), value_name = "declaration.yaml")]
        file: String,

        /// Module with placeholder views, as path:attr[,attr...].
        #[arg(long, short)]
        module: Vec<String>,

        /// Environment variable, as KEY=VALUE.
        #[arg(long, short)]
        env: Vec<String>,

        /// Read environment variables from the process instead.
        #[arg(long)]
        process_env: bool,
    },
}

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: RouteScopeCommand,
}

fn main() -> Result<()> {
    env_logger::init();

    // Parse and dispatch command.
    let cli = Cli::parse();
    match cli.command {
        RouteScopeCommand::Urls {
            file,
            module,
            env,
            process_env,
        } => urls(&file, &module, &env, process_env),
        RouteScopeCommand::Check {
            file,
            module,
            env,
            process_env,
        } => check(&file, &module, &env, process_env),
    }
}
