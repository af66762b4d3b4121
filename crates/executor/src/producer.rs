use tokio::sync::mpsc::Sender;
use tracing::info;

use super::{
    error::Error,
    types::{PathQuery, QueryStreamer},
};

pub struct Producer<S: QueryStreamer> {
    streamer: S,
}

impl<S> Producer<S>
where
    S: QueryStreamer,
{
    pub fn new(streamer: S) -> Self {
        Producer { streamer }
    }

    pub fn spawn(self, sender: Sender<Vec<PathQuery>>) -> tokio::task::JoinHandle<Result<(), Error>> {
        info!("Producer ready.");
        tokio::spawn(async move { self.streamer.run_stream(sender).await })
    }
}
