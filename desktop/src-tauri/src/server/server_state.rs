/// Current state of the bundled application server, as observed by the
/// shell. Once `Running` or `Failed` is reached the transition is
/// terminal for the session; there is no restart path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerState {
    /// Server has not been launched
    Stopped,
    /// Server process launched, readiness probe in flight
    Starting,
    /// Something is accepting connections on the loopback endpoint
    Running { port: u16 },
    /// Shell is taking the server down
    ShuttingDown,
    /// Launch failed or the readiness budget was exhausted
    Failed { error: String },
}
