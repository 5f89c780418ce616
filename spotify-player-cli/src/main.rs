use std::process;

mod cli;
mod output;
#[cfg(feature = "rodio")]
mod play;

#[tokio::main]
async fn main() {
    match cli::run().await {
        Ok(()) => {}
        Err(err) => {
            println!("{err}");
            process::exit(1);
        }
    }
}
