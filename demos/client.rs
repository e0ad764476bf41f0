use clap::Parser;

use futures_util::{future, pin_mut, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use futures_channel::mpsc;
use git_version::git_version;
use std::error::Error;
use url::Url;

use wheelman::api::ConfigEvent;

const GIT_VERSION: &str = git_version!(args = ["--always"], fallback = "unknown");

/// Publishes configuration events typed on stdin, one per line,
/// e.g. `561_AOTF Channel 2` or `561_AOTF Channel toggle`.
#[derive(Parser)]
#[clap(name = "Example Wheelman client", version = GIT_VERSION)]
struct Opts {
    #[clap(default_value = "ws://127.0.0.1:9000/events")]
    pub url: Url,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let opts: Opts = Opts::parse();

    let (ws_stream, _) = connect_async(opts.url).await?;
    println!("websocket connected");

    let (stdin_tx, stdin_rx) = mpsc::unbounded();
    let (ws_tx, ws_rx) = ws_stream.split();

    tokio::spawn(read_stdin(stdin_tx));

    let stdin_to_ws = stdin_rx.map(Ok).forward(ws_tx);
    let ws_to_stdout = {
        ws_rx.for_each(|message| async move {
            let mut data = match message {
                Ok(m) => m.into_data(),
                Err(e) => format!("error: {}", e).into_bytes(),
            };
            data.push(b'\n');
            if let Err(e) = tokio::io::stdout().write_all(&data).await {
                eprintln!("failed to write stdout: {}", e);
            }
        })
    };

    pin_mut!(stdin_to_ws, ws_to_stdout);
    future::select(stdin_to_ws, ws_to_stdout).await;

    Ok(())
}

async fn read_stdin(tx: mpsc::UnboundedSender<Message>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match line.parse::<ConfigEvent>() {
            Ok(event) => {
                if tx.unbounded_send(Message::text(event.to_string())).is_err() {
                    break;
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }
}
