//! # structconf demo application
//!
//! A sample program that binds one record to every source structconf knows.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example structconf_demo -- --token abc
//! ```
//!
//! | Feature | How to exercise it |
//! |---------|--------------------|
//! | Defaults | `cargo run --example structconf_demo -- --token abc` |
//! | Env var | `DEMO_SERVER_PORT=9999 DEMO_TOKEN=abc cargo run --example structconf_demo` |
//! | Alias fallback | `COLOR=red DEMO_TOKEN=abc cargo run --example structconf_demo` |
//! | Config file | Create `config.toml` in cwd with `[server]\nport = 1`, then run |
//! | Required check | `cargo run --example structconf_demo` |
//! | Default config | `cargo run --example structconf_demo -- --default-config` |
//! | Resolution report | `cargo run --example structconf_demo -- --config-debug` |

use std::time::Duration;

use structconf::Settings;

#[derive(Settings, Default, Debug)]
struct DemoConfig {
    /// API token.
    #[config(required)]
    token: String,

    /// Emit extra output.
    #[config(short = "v")]
    verbose: bool,

    #[config(nested)]
    server: ServerConfig,

    #[config(nested, file = "display")]
    ui: DisplayConfig,
}

#[derive(Settings, Default, Debug)]
struct ServerConfig {
    /// Address to bind.
    #[config(default = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[config(default = 3000)]
    port: u16,

    /// Idle connection timeout.
    #[config(default = "90s")]
    idle_timeout: Duration,
}

#[derive(Settings, Default, Debug)]
struct DisplayConfig {
    /// Output color.
    #[config(file = "color", default = "yellow")]
    colour: String,

    #[config(default = "app=info")]
    levels: std::collections::HashMap<String, String>,
}

fn main() {
    let mut config = DemoConfig::default();
    let mut resolver = structconf::Resolver::builder()
        .version(concat!("structconf-demo ", env!("CARGO_PKG_VERSION")))
        .build();

    if let Err(e) = resolver.process("demo", &mut config) {
        eprintln!("error: {e}");
        std::process::exit(2);
    }
    if let Some(e) = resolver.file_error() {
        eprintln!("note: {e}");
    }

    println!("{config:#?}");
}
