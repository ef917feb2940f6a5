mod check;
mod data;
mod demo;
mod model;
mod objective;
mod repair;
mod rotation;
mod scenario;
mod server;
mod solver;
mod storage;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    server::run_server().await;
}
