use async_stream::stream;
use futures::stream::Stream;
use futures::stream::StreamExt;
use quire_client::{Client, ClientError, ClientSink};
use quire_core::random::{random_edit, random_string};
use quire_core::{Operation, OtError};
use quire_server::{ServerAuthority, ServerError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum StressError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Operation(#[from] OtError),

    #[error("Authority task stopped")]
    AuthorityGone,

    #[error("Client task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Client {client} diverged: {document:?} != {expected:?}")]
    Diverged {
        client: usize,
        document: String,
        expected: String,
    },
}

/// Parameters of one stress run
#[derive(Clone, Debug)]
pub struct StressConfig {
    pub num_clients: usize,
    pub edits_per_client: usize,
    /// Length of the random starting document, in characters
    pub initial_length: usize,
    pub seed: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            num_clients: 4,
            edits_per_client: 100,
            initial_length: 50,
            seed: 42,
        }
    }
}

/// Statistics collected during stress testing
#[derive(Clone, Debug)]
pub struct StressTestStats {
    pub num_clients: usize,
    pub edits_per_client: usize,
    pub final_revision: usize,
    pub total_deliveries: usize,
    pub document_length: usize,
    pub total_time: Duration,
    pub avg_submit_time: Duration,
    pub ops_per_second: f64,
}

impl StressTestStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Stress Test Statistics                         ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Number of Clients:         {:>38} ║", self.num_clients);
        println!("║  Edits per Client:          {:>38} ║", self.edits_per_client);
        println!("║  Final Revision:            {:>38} ║", self.final_revision);
        println!("║  Messages Delivered:        {:>38} ║", self.total_deliveries);
        println!("║  Final Document Length:     {:>38} ║", self.document_length);
        println!("║  Total Time:                {:>39}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("║  Average Submit Time:       {:>36}µs ║", format!("{:.2}", self.avg_submit_time.as_micros()));
        println!("║  Operations/Second:         {:>38.0} ║", self.ops_per_second);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// Server-to-client traffic
#[derive(Debug)]
enum Incoming {
    Ack(usize),
    Operation(usize, Operation),
}

enum AuthorityRequest {
    Submit {
        client: usize,
        revision: usize,
        operation: Operation,
        reply: oneshot::Sender<Result<usize, ServerError>>,
    },
    Snapshot {
        reply: oneshot::Sender<(String, usize)>,
    },
}

/// The authority as a single task: requests are handled strictly one at a
/// time, and acks/broadcasts are queued before the submitter hears back.
async fn run_authority(
    document: String,
    mut requests: mpsc::Receiver<AuthorityRequest>,
    inboxes: Vec<mpsc::UnboundedSender<Incoming>>,
) {
    let mut authority = ServerAuthority::<Operation>::new(document);
    while let Some(request) = requests.recv().await {
        match request {
            AuthorityRequest::Submit {
                client,
                revision,
                operation,
                reply,
            } => {
                let result = match authority.receive_operation(revision, operation) {
                    Ok(Some(rebased)) => {
                        let revision = authority.revision();
                        for (index, inbox) in inboxes.iter().enumerate() {
                            let message = if index == client {
                                Incoming::Ack(revision)
                            } else {
                                Incoming::Operation(revision, rebased.clone())
                            };
                            if inbox.send(message).is_err() {
                                debug!(client = index, "Inbox closed");
                            }
                        }
                        Ok(revision)
                    }
                    Ok(None) => Ok(authority.revision()),
                    Err(err) => {
                        warn!(client, %err, "Authority rejected operation");
                        Err(err)
                    }
                };
                let _ = reply.send(result);
            }
            AuthorityRequest::Snapshot { reply } => {
                let _ = reply.send((authority.document().to_string(), authority.revision()));
            }
        }
    }
    debug!(revision = authority.revision(), "Authority stopped");
}

/// A client's local document and the edits it has handed to the transport.
struct Replica {
    document: String,
    sent: Vec<(usize, Operation)>,
}

impl ClientSink<Operation> for Replica {
    fn send_operation(&mut self, revision: usize, operation: &Operation) {
        self.sent.push((revision, operation.clone()));
    }

    fn apply_operation(&mut self, operation: &Operation) -> quire_client::Result<()> {
        self.document = operation.apply(&self.document)?;
        Ok(())
    }

    fn get_operations(&mut self, base: usize, head: usize) {
        // Inboxes are ordered, so acks never skip revisions here.
        warn!(base, head, "Unexpected history request");
    }
}

struct SimulatedClient {
    index: usize,
    client: Client<Operation>,
    replica: Replica,
    inbox: mpsc::UnboundedReceiver<Incoming>,
    authority: mpsc::Sender<AuthorityRequest>,
    submit_times: Vec<Duration>,
    deliveries: usize,
}

impl SimulatedClient {
    fn edit(&mut self, rng: &mut StdRng) -> Result<(), StressError> {
        let operation = random_edit(rng, &self.replica.document);
        self.replica.document = operation.apply(&self.replica.document)?;
        self.client.apply_client(operation, &mut self.replica)?;
        Ok(())
    }

    /// Handle up to `limit` queued server messages.
    fn deliver(&mut self, limit: usize) -> Result<usize, StressError> {
        let mut delivered = 0;
        while delivered < limit {
            let Ok(message) = self.inbox.try_recv() else {
                break;
            };
            match message {
                Incoming::Ack(revision) => self.client.server_ack(revision, &mut self.replica)?,
                Incoming::Operation(revision, operation) => {
                    self.client
                        .apply_server(revision, &operation, &mut self.replica)?
                }
            }
            delivered += 1;
        }
        self.deliveries += delivered;
        Ok(delivered)
    }

    /// Submit everything the protocol sent since the last flush.
    async fn flush(&mut self) -> Result<usize, StressError> {
        let sent = std::mem::take(&mut self.replica.sent);
        let count = sent.len();
        for (revision, operation) in sent {
            let start = Instant::now();
            let (reply, response) = oneshot::channel();
            self.authority
                .send(AuthorityRequest::Submit {
                    client: self.index,
                    revision,
                    operation,
                    reply,
                })
                .await
                .map_err(|_| StressError::AuthorityGone)?;
            response.await.map_err(|_| StressError::AuthorityGone)??;
            self.submit_times.push(start.elapsed());
        }
        Ok(count)
    }
}

#[derive(Clone, Copy, Debug)]
enum Step {
    Edit,
    Deliver(usize),
}

/// Generator that interleaves local edits with batches of incoming messages
fn client_steps(seed: u64, edits: usize) -> impl Stream<Item = Step> {
    stream! {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut remaining = edits;
        while remaining > 0 {
            if rng.gen_bool(0.5) {
                remaining -= 1;
                yield Step::Edit;
            } else {
                yield Step::Deliver(rng.gen_range(1..=4));
            }
        }
    }
}

async fn run_client(
    mut client: SimulatedClient,
    seed: u64,
    edits: usize,
) -> Result<SimulatedClient, StressError> {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    let mut steps = Box::pin(client_steps(seed, edits));
    let mut step_count = 0usize;
    while let Some(step) = steps.next().await {
        match step {
            Step::Edit => client.edit(&mut rng)?,
            Step::Deliver(limit) => {
                client.deliver(limit)?;
            }
        }
        client.flush().await?;

        step_count += 1;
        if step_count % 10 == 0 {
            tokio::task::yield_now().await;
        }
    }
    Ok(client)
}

/// Concurrent clients editing one document through a single authority task
pub async fn stress_test_convergence(config: &StressConfig) -> Result<StressTestStats, StressError> {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Convergence Stress Test (Async)                     ║");
    println!("║  Clients: {} | Edits/Client: {} | Seed: {} ║",
             config.num_clients, config.edits_per_client, config.seed);
    println!("╚════════════════════════════════════════════════════════════╝");

    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let initial = random_string(&mut rng, config.initial_length);

    let (authority_tx, authority_rx) = mpsc::channel(256);
    let (inbox_txs, inbox_rxs): (Vec<_>, Vec<_>) = (0..config.num_clients)
        .map(|_| mpsc::unbounded_channel())
        .unzip();
    let authority = tokio::spawn(run_authority(initial.clone(), authority_rx, inbox_txs));

    info!(clients = config.num_clients, "[Phase 1/2] Editing concurrently");

    let mut handles = Vec::with_capacity(config.num_clients);
    for (index, inbox) in inbox_rxs.into_iter().enumerate() {
        let client = SimulatedClient {
            index,
            client: Client::new(0),
            replica: Replica {
                document: initial.clone(),
                sent: Vec::new(),
            },
            inbox,
            authority: authority_tx.clone(),
            submit_times: Vec::new(),
            deliveries: 0,
        };
        let seed = config.seed.wrapping_add(index as u64 + 1);
        handles.push(tokio::spawn(run_client(client, seed, config.edits_per_client)));
    }

    let mut clients = Vec::with_capacity(handles.len());
    for handle in handles {
        clients.push(handle.await??);
    }

    info!("[Phase 1/2] Completed");
    info!("[Phase 2/2] Draining in-flight messages");

    loop {
        let mut progressed = 0;
        for client in &mut clients {
            progressed += client.deliver(usize::MAX)?;
            progressed += client.flush().await?;
        }
        if progressed == 0 {
            break;
        }
    }

    let (reply, response) = oneshot::channel();
    authority_tx
        .send(AuthorityRequest::Snapshot { reply })
        .await
        .map_err(|_| StressError::AuthorityGone)?;
    let (document, revision) = response.await.map_err(|_| StressError::AuthorityGone)?;

    for client in &clients {
        if !client.client.is_synchronized() || client.replica.document != document {
            return Err(StressError::Diverged {
                client: client.index,
                document: client.replica.document.clone(),
                expected: document,
            });
        }
    }

    let total_time = start.elapsed();
    let submit_times: Vec<Duration> = clients
        .iter()
        .flat_map(|client| client.submit_times.iter().copied())
        .collect();
    let avg_submit_time = if !submit_times.is_empty() {
        submit_times.iter().sum::<Duration>() / submit_times.len() as u32
    } else {
        Duration::ZERO
    };
    let total_deliveries: usize = clients.iter().map(|client| client.deliveries).sum();
    let ops_per_second = (revision + total_deliveries) as f64 / total_time.as_secs_f64();

    drop(clients);
    drop(authority_tx);
    authority.await?;

    info!(revision, "[Phase 2/2] All clients converged");

    Ok(StressTestStats {
        num_clients: config.num_clients,
        edits_per_client: config.edits_per_client,
        final_revision: revision,
        total_deliveries,
        document_length: document.chars().count(),
        total_time,
        avg_submit_time,
        ops_per_second,
    })
}

/// Repeated runs with a growing number of clients
pub async fn stress_test_scaling(max_clients: usize, step_size: usize) -> Result<(), StressError> {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║      Scaling Analysis - Convergence vs Clients             ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut current_clients = step_size;
    while current_clients <= max_clients {
        let config = StressConfig {
            num_clients: current_clients,
            edits_per_client: 50,
            seed: current_clients as u64,
            ..StressConfig::default()
        };
        stress_test_convergence(&config).await?.print();
        current_clients += step_size;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_small_run_converges() {
        let config = StressConfig {
            num_clients: 3,
            edits_per_client: 40,
            initial_length: 20,
            seed: 7,
        };
        let stats = stress_test_convergence(&config).await.unwrap();
        assert_eq!(stats.num_clients, 3);
        // Buffered edits are submitted together, so never more revisions
        // than edits.
        assert!(stats.final_revision >= 1);
        assert!(stats.final_revision <= 3 * 40);
        assert!(stats.document_length <= 20 + 5 * 3 * 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_clients_converge() {
        let config = StressConfig {
            num_clients: 8,
            edits_per_client: 60,
            initial_length: 0,
            seed: 11,
        };
        let stats = stress_test_convergence(&config).await.unwrap();
        assert!(stats.total_deliveries > 0);
        assert!(stats.final_revision <= 8 * 60);
        assert!(stats.document_length <= 5 * 8 * 60);
    }

    #[tokio::test]
    async fn test_client_steps_yield_every_edit() {
        let steps: Vec<Step> = client_steps(3, 25).collect().await;
        let edits = steps.iter().filter(|step| matches!(step, Step::Edit)).count();
        assert_eq!(edits, 25);
    }
}
