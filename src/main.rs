use clap::Parser;
use futures_util::{SinkExt, StreamExt, TryFutureExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use warp::filters::ws::{Message, WebSocket};
use warp::Filter;

use wheelman::api::ConfigEvent;
use wheelman::bus::WheelRef;
use wheelman::cli::Opts;
use wheelman::mock::MockWheel;
use wheelman::wheel::FilterWheel;

/// # Wheelman Webservice
/// Websocket service that turns configuration-change notifications into
/// filter wheel moves.
///
/// Each text frame is `<device> <property> <value>`; the reply is the wheel
/// position after handling it, or the error.
///
/// Ctrl+C homes the wheel and releases the port before exiting.
#[tokio::main]
async fn main() -> wheelman::Result<()> {
    let opts: Opts = Opts::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&opts.log_level)),
        )
        .init();

    let config = opts.wheel_config();
    let wheel = if opts.simulate {
        info!("using simulated wheel");
        let (mock, _handle) = MockWheel::new();
        WheelRef::spawn(FilterWheel::with_transport(mock, &config)?)
    } else {
        WheelRef::spawn(FilterWheel::open(&config)?)
    };

    let killer = wheel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received Ctrl+C");
        if let Err(e) = killer.blocking_close() {
            error!("{}", e);
        }
    }) {
        warn!("Ctrl+C handler not installed: {}", e);
    }

    let closed = wheel.clone();
    let with_wheel = warp::any().map(move || wheel.clone());
    let routes = warp::path("events")
        .and(warp::ws())
        .and(with_wheel)
        .map(|ws: warp::ws::Ws, wheel| ws.on_upgrade(|websocket| connection(websocket, wheel)));

    let address: [u8; 4] = opts.address.into();
    info!("websocket ready on {:?}:{}/events", address, opts.listen_port);

    tokio::select! {
        _ = warp::serve(routes).run((address, opts.listen_port)) => {}
        _ = closed.closed() => info!("filter wheel closed, shutting down"),
    }

    Ok(())
}

async fn connection(websocket: WebSocket, wheel: WheelRef) {
    let (mut ws_tx, mut from_client) = websocket.split();
    let (to_client, rx) = mpsc::unbounded_channel();

    info!("event source connected");

    let mut rx = UnboundedReceiverStream::new(rx);
    tokio::task::spawn(async move {
        while let Some(message) = rx.next().await {
            ws_tx
                .send(message)
                .unwrap_or_else(|e| {
                    warn!("websocket send error: {}", e);
                })
                .await;
        }
    });

    while let Some(result) = from_client.next().await {
        let reply = match result {
            Ok(msg) if msg.is_text() => {
                let text = msg.to_str().unwrap_or_default();
                match text.parse::<ConfigEvent>() {
                    Ok(event) => wheel.configure(event).await,
                    Err(e) => Err(e),
                }
            }
            Ok(msg) if msg.is_close() => break,
            Ok(_) => {
                warn!("unsupported message type");
                continue;
            }
            Err(e) => {
                warn!("websocket error: {}", e);
                break;
            }
        };

        let text = match reply {
            Ok(state) => state.to_string(),
            Err(e) => format!("error: {}", e),
        };
        if to_client.send(Message::text(text)).is_err() {
            break;
        }
    }

    info!("event source disconnected")
}
