use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::api::{self, Command, ConfigEvent, State};
use crate::transport::Transport;
use crate::wheel::FilterWheel;
use crate::{Error, Result};

struct Request {
    command: Command,
    reply: oneshot::Sender<Result<State>>,
}

/// Handle to a wheel owned by its own blocking task.
///
/// Every request goes through one channel, so direct moves and configuration
/// events never touch the wheel concurrently.
#[derive(Clone)]
pub struct WheelRef {
    sender: mpsc::Sender<Request>,
}

impl WheelRef {
    /// Must be called from within a tokio runtime.
    pub fn spawn<T: Transport + 'static>(wheel: FilterWheel<T>) -> WheelRef {
        let (tx, rx) = mpsc::channel(10);
        let actor = Wheelman::new(wheel, rx);
        tokio::task::spawn_blocking(move || run_actor(actor));
        WheelRef { sender: tx }
    }

    pub async fn request(&self, command: Command) -> Result<State> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Request { command, reply })
            .await
            .map_err(|_| Error::ActorGone)?;
        response.await.map_err(|_| Error::ActorGone)?
    }

    pub async fn move_to(&self, slot: u8, speed: u8) -> Result<State> {
        self.request(Command::Move { slot, speed }).await
    }

    pub async fn toggle(&self) -> Result<State> {
        self.request(Command::Toggle).await
    }

    pub async fn configure(&self, event: ConfigEvent) -> Result<State> {
        self.request(Command::Configure(event)).await
    }

    /// Home and release the wheel, then stop the actor.
    pub async fn close(&self) -> Result<State> {
        self.request(Command::Close).await
    }

    /// Like [`WheelRef::close`] but usable outside the runtime, e.g. from a signal handler.
    pub fn blocking_close(&self) -> Result<State> {
        let (reply, response) = oneshot::channel();
        self.sender
            .blocking_send(Request {
                command: Command::Close,
                reply,
            })
            .map_err(|_| Error::ActorGone)?;
        response.blocking_recv().map_err(|_| Error::ActorGone)?
    }

    /// Resolves once the actor has stopped.
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}

struct Wheelman<T: Transport> {
    cmdbus: mpsc::Receiver<Request>,
    wheel: FilterWheel<T>,
}

impl<T: Transport> Wheelman<T> {
    fn new(wheel: FilterWheel<T>, rx: mpsc::Receiver<Request>) -> Self {
        Wheelman { cmdbus: rx, wheel }
    }

    fn handle(&mut self, cmd: api::Command) -> Result<State> {
        match cmd {
            Command::Move { slot, speed } => self.wheel.move_to(slot, speed),
            Command::Toggle => self.wheel.toggle(),
            Command::Configure(event) => {
                debug!("{}", event);
                self.wheel
                    .handle_configuration_event(&event.device, &event.property, &event.value)
            }
            // handled by run_actor, which owns the wheel by value
            Command::Close => Ok(self.wheel.state()),
        }
    }
}

fn run_actor<T: Transport>(mut actor: Wheelman<T>) {
    loop {
        match actor.cmdbus.blocking_recv() {
            Some(Request {
                command: Command::Close,
                reply,
            }) => {
                let result = shut_down(actor);
                let _ = reply.send(result);
                return;
            }
            Some(Request { command, reply }) => {
                let result = actor.handle(command);
                if let Err(e) = &result {
                    error!("{}", e);
                }
                let _ = reply.send(result);
            }
            None => {
                info!("all handles dropped, closing");
                if let Err(e) = shut_down(actor) {
                    error!("{}", e);
                }
                return;
            }
        }
    }
}

fn shut_down<T: Transport>(actor: Wheelman<T>) -> Result<State> {
    let Wheelman { mut cmdbus, wheel } = actor;
    cmdbus.close();
    let mut state = wheel.state();
    wheel.close()?;
    state.position = crate::wheel::HOME_SLOT;
    Ok(state)
}
