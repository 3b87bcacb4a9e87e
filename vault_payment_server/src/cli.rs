use std::{env, env::VarError};

/// The server takes no arguments. Any argument at all prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print. Secrets must never be added here.
    const DISPLAY_ENVS: [&str; 14] = [
        "RUST_LOG",
        "VPG_HOST",
        "VPG_PORT",
        "VPG_DATABASE_URL",
        "VPG_NOWPAYMENTS_API_URL",
        "VPG_IPN_CALLBACK_URL",
        "VPG_TELEGRAM_ADMIN_CHAT_ID",
        "VPG_USE_X_FORWARDED_FOR",
        "VPG_USE_FORWARDED",
        "VPG_PRODUCT_CACHE_TTL",
        "VPG_ORDER_RATE_LIMIT",
        "VPG_PAYMENT_TOLERANCE",
        "VPG_INVOICE_TIMEOUT",
        "VPG_INVOICE_MAX_ATTEMPTS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
