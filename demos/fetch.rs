use gosub_net::{ClientConfig, Session};
use std::time::Duration;

// Fetches a url and prints the status line, the cookies the server set and the body.
//
//     RUST_LOG=debug cargo run --example fetch -- https://example.com/
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com/".to_string());

    // Session wide defaults. Every request minted by the session starts from these values.
    let config = ClientConfig {
        read_timeout: Duration::from_secs(15),
        ..ClientConfig::default()
    };
    let session = Session::new(Some(config));

    let response = session.send(session.get(&url)?)?;
    println!("{} ({})", response.status_line(), response.url());
    for (name, value) in response.headers() {
        println!("{name}: {value}");
    }
    println!();

    let response = response.check_status()?.to_text_response()?;
    for cookie in &response.cookies {
        println!("cookie {}={} (domain {}, path {})", cookie.name, cookie.value, cookie.domain, cookie.path);
    }
    println!("{}", response.body);

    Ok(())
}
