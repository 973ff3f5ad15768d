use std::env;
use std::net::SocketAddr;
use std::process;

use getopts::Options;
use reqwest::Url;

use crate::google::DEFAULT_API_URL;

pub const TOKEN_VAR: &str = "GOOGLE_CALENDAR_TOKEN";
pub const DEFAULT_CALENDAR: &str = "Kids";

pub struct Args {
    pub address: SocketAddr,
    pub calendar: String,
    pub api_url: Url,
    pub token: String,
}

pub enum Parsed {
    Help(String),
    Run(Args),
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "a",
        "address",
        "Socket address (IP and port) to listen on [Default: 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optopt(
        "c",
        "calendar",
        "Name of the calendars to look for the marker event in [Default: Kids]",
        "NAME",
    );
    opts.optopt(
        "u",
        "api-url",
        "Base URL of the Google Calendar API [Default: https://www.googleapis.com/calendar/v3]",
        "URL",
    );
    opts
}

/// Parses `args` (without the program name). The access token is passed in
/// separately since it only comes from the environment.
pub fn try_parse(args: Vec<String>, token: Option<String>) -> Result<Parsed, String> {
    let opts = opts();

    let matches = opts.parse(args).map_err(|fail| fail.to_string())?;

    if matches.opt_present("help") {
        return Ok(Parsed::Help(
            opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))),
        ));
    }

    let address = matches
        .opt_get_default("address", SocketAddr::from(([127, 0, 0, 1], 8080)))
        .map_err(|err| format!("Provided value for option 'address' is invalid: {err}"))?;

    let calendar = matches
        .opt_str("calendar")
        .unwrap_or_else(|| DEFAULT_CALENDAR.to_string());

    let api_url = match matches.opt_str("api-url") {
        Some(url) => Url::parse(&url)
            .map_err(|err| format!("Provided value for option 'api-url' is invalid: {err}"))?,
        None => Url::parse(DEFAULT_API_URL).map_err(|err| err.to_string())?,
    };

    if api_url.cannot_be_a_base() {
        return Err(format!("Provided value for option 'api-url' is not a base URL: {api_url}"));
    }

    let token = token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| format!("`{TOKEN_VAR}` environment variable is not set"))?;

    Ok(Parsed::Run(Args {
        address,
        calendar,
        api_url,
        token,
    }))
}

pub fn parse(args: Vec<String>) -> Args {
    match try_parse(args, env::var(TOKEN_VAR).ok()) {
        Ok(Parsed::Run(args)) => args,
        Ok(Parsed::Help(usage)) => {
            println!("{usage}");
            process::exit(0);
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
