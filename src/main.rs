use std::env;

#[tokio::main]
async fn main() {
    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        worth_estimator::api::init_tracing("worth_estimator=info");
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        if let Err(e) = worth_estimator::api::run_http_server(port).await {
            eprintln!("Server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    worth_estimator::api::init_tracing("warn");
    if let Err(e) = worth_estimator::api::run_cli(raw_args) {
        eprintln!("error: {e}");
        std::process::exit(2);
    }
}
