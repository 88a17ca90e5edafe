use count_connect_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("count-connect error: {err}");
        std::process::exit(1);
    }
}
