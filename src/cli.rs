use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(herald::config::AppConfig, SocketAddr),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }

    if cli.reminder_hour > 23 {
        eprintln!(
            "error: --reminder-hour must be between 0 and 23, got {}",
            cli.reminder_hour
        );
        return RunOutcome::Exit(2);
    }
    if let Some(seed) = cli.seed.as_ref()
        && !seed.is_file()
    {
        eprintln!("error: seed file not found: {}", seed.display());
        return RunOutcome::Exit(2);
    }

    RunOutcome::Serve(
        herald::config::AppConfig {
            app_name: cli.app_name,
            seed: cli.seed,
            reminder_hour: cli.reminder_hour,
            vapid_private_key: cli.vapid_private_key,
            vapid_subject: cli.vapid_subject,
        },
        cli.listen,
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "herald",
    version,
    about = "Push notification service for small communities"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, default_value = "127.0.0.1:3000", env = "HERALD_LISTEN")]
    listen: SocketAddr,
    #[arg(long, default_value = "Herald")]
    app_name: String,
    #[arg(long, env = "HERALD_SEED")]
    seed: Option<PathBuf>,
    #[arg(long, default_value_t = 10, env = "HERALD_REMINDER_HOUR")]
    reminder_hour: u8,
    #[arg(long, env = "HERALD_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "HERALD_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match herald::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("HERALD_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("HERALD_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace HERALD_VAPID_SUBJECT with a contact URI you control.");
    }
    println!();
    println!(
        "Public key (served to clients at /api/push/public-key): {}",
        credentials.public_key
    );
    println!();
    println!(
        "--vapid-private-key \"{}\" --vapid-subject \"{subject}\"",
        credentials.private_key
    );
    0
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn cli__should_use_sensible_defaults() {
        // When
        let cli = Cli::try_parse_from(["herald"]).expect("parse cli");

        // Then
        assert_eq!(cli.listen, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(cli.app_name, "Herald");
        assert_eq!(cli.reminder_hour, 10);
        assert!(cli.seed.is_none());
        assert!(cli.vapid_private_key.is_none());
        assert!(cli.vapid_subject.is_none());
    }

    #[test]
    fn cli__should_parse_overrides() {
        // When
        let cli = Cli::try_parse_from([
            "herald",
            "--listen",
            "0.0.0.0:8080",
            "--app-name",
            "Clubhouse",
            "--seed",
            "/tmp/seed.toml",
            "--reminder-hour",
            "7",
            "--vapid-private-key",
            "key",
            "--vapid-subject",
            "mailto:admin@example.org",
        ])
        .expect("parse cli");

        // Then
        assert_eq!(cli.listen, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(cli.app_name, "Clubhouse");
        assert_eq!(cli.seed, Some(PathBuf::from("/tmp/seed.toml")));
        assert_eq!(cli.reminder_hour, 7);
        assert_eq!(cli.vapid_private_key.as_deref(), Some("key"));
        assert_eq!(cli.vapid_subject.as_deref(), Some("mailto:admin@example.org"));
    }

    #[test]
    fn cli__should_reject_a_malformed_listen_address() {
        // Then
        assert!(Cli::try_parse_from(["herald", "--listen", "not-an-addr"]).is_err());
        assert!(Cli::try_parse_from(["herald", "--reminder-hour", "late"]).is_err());
    }
}
