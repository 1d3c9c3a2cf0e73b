use crate::error::{BuildError, RuntimeFatal};
use crate::queue::HashByRef;
use crate::queue::Scheduler;
use crate::types::{NanoTime, Node};

use crossbeam::channel::{Receiver, SendError, Sender, select};
use std::cmp::{max, min};
use std::collections::{HashMap, HashSet};
use std::convert::TryInto;
use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use std::vec;

static GRAPH_ID: LazyLock<Mutex<usize>> = LazyLock::new(|| Mutex::new(0));

struct NodeData {
    node: Rc<dyn Node>,
    upstreams: Vec<(usize, bool)>,
    downstreams: Vec<(usize, bool)>,
    layer: usize,
}

/// Whether the [Graph] should run RealTime or Historical mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RunMode {
    RealTime,
    HistoricalFrom(NanoTime),
}

impl RunMode {
    pub fn start_time(&self) -> NanoTime {
        match self {
            RunMode::RealTime => NanoTime::now(),
            RunMode::HistoricalFrom(start_time) => *start_time,
        }
    }
}

/// Defines how long the graph should run for. Can be a
/// Duration, number of cycles or forever.
#[derive(Clone, Copy, Debug)]
pub enum RunFor {
    Duration(Duration),
    Cycles(u32),
    Forever,
}

/// A struct produced by [Graph] that can be used by a [Node] to notify the
/// [Graph] that it is required to be cycled on the next engine cycle. It
/// is bound to the [Node] that created it. This is the notification side
/// of the push-adapter boundary (C6): an adapter thread holds one of these
/// and calls `notify()` after enqueuing work on its own channel.
#[derive(Clone, Debug)]
pub struct ReadyNotifier {
    pub(crate) node_index: usize,
    pub(crate) sender: Sender<usize>,
}

impl ReadyNotifier {
    pub fn notify(&self) -> Result<(), SendError<usize>> {
        self.sender.send(self.node_index)
    }
}

/// A thread-safe, idempotent handle for stopping a running [Graph]. The
/// only mechanism that can terminate a run early: once sent, the loop
/// finishes its current cycle and returns. Sending twice, or after the
/// run has already ended, is a no-op.
#[derive(Clone, Debug)]
pub struct StopHandle {
    sender: Sender<()>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.sender.send(());
    }
}

/// Maintains the parts of the graph state that is accessible to Nodes.
pub struct GraphState {
    time: NanoTime,
    is_last_cycle: bool,
    current_node_index: Option<usize>,
    scheduled_callbacks: Scheduler<usize>,
    always_callbacks: Vec<usize>,
    result: Option<anyhow::Result<()>>,
    node_to_index: HashMap<HashByRef<dyn Node>, usize>,
    node_ticked: Vec<bool>,
    run_time: Arc<tokio::runtime::Runtime>,
    run_mode: RunMode,
    run_for: RunFor,
    ready_notifier: Sender<usize>,
    ready_callbacks: Receiver<usize>,
    stop_sender: Sender<()>,
    stop_receiver: Receiver<()>,
    start_time: NanoTime,
    id: usize,
    nodes: Vec<NodeData>,
    dirty_nodes_by_layer: Vec<Vec<usize>>,
    node_dirty: Vec<bool>,
}

impl GraphState {
    fn new(run_time: Arc<tokio::runtime::Runtime>, run_mode: RunMode, run_for: RunFor) -> Self {
        let (ready_notifier, ready_callbacks) = crossbeam::channel::unbounded();
        let (stop_sender, stop_receiver) = crossbeam::channel::bounded(1);
        let mut id = GRAPH_ID.lock().unwrap();
        let slf = Self {
            time: NanoTime::ZERO,
            is_last_cycle: false,
            current_node_index: None,
            scheduled_callbacks: Scheduler::new(),
            always_callbacks: Vec::new(),
            result: None,
            node_to_index: HashMap::new(),
            node_ticked: Vec::new(),
            run_time,
            run_mode,
            run_for,
            ready_notifier,
            ready_callbacks,
            stop_sender,
            stop_receiver,
            start_time: NanoTime::ZERO,
            id: *id,
            nodes: Vec::new(),
            dirty_nodes_by_layer: Vec::new(),
            node_dirty: Vec::new(),
        };
        *id += 1;
        slf
    }

    /// The current engine time.
    pub fn time(&self) -> NanoTime {
        self.time
    }

    /// Time elapsed since the engine started.
    pub fn elapsed(&self) -> NanoTime {
        self.time - self.start_time
    }

    pub fn start_time(&self) -> NanoTime {
        self.start_time
    }

    /// A cloneable notifier bound to the node currently being set up,
    /// started or cycled. Hand it to a push/push-pull adapter's worker
    /// thread so it can wake the cycle loop after it pushes a tick.
    pub fn ready_notifier(&self) -> ReadyNotifier {
        ReadyNotifier {
            node_index: self.current_node_index.unwrap(),
            sender: self.ready_notifier.clone(),
        }
    }

    pub fn tokio_runtime(&self) -> Arc<tokio::runtime::Runtime> {
        self.run_time.clone()
    }

    /// Schedule the currently-cycling (or currently-starting) node to be
    /// woken at `time`. This is the primitive [`crate::alarm`] and the
    /// adapter modules build on.
    pub fn add_callback(&mut self, time: NanoTime) {
        let ix = self.current_node_index.unwrap();
        self.add_callback_for_node(ix, time);
    }

    pub fn always_callback(&mut self) {
        let ix = self.current_node_index.unwrap();
        self.always_callbacks.push(ix);
    }

    pub fn is_last_cycle(&self) -> bool {
        self.is_last_cycle
    }

    /// Returns true if `node` has ticked on the current engine cycle.
    pub fn ticked(&self, node: Rc<dyn Node>) -> bool {
        match self.node_index(node) {
            Some(ix) => self.node_ticked[ix],
            None => false,
        }
    }

    /// Terminates the run after the current cycle, surfacing `result`
    /// from `Graph::run`.
    pub fn terminate(&mut self, result: anyhow::Result<()>) {
        self.result = Some(result)
    }

    /// The index of the node currently being cycled, set up, started or
    /// stopped. Only meaningful while the graph is invoking one of those
    /// hooks.
    pub(crate) fn current_node_index(&self) -> usize {
        self.current_node_index.unwrap()
    }

    /// The rank assigned to a node at build time (longest path from any
    /// source). Used as the scheduler's rank component so that a node
    /// scheduling a same-time callback for itself or a downstream node is
    /// drained no earlier than its own rank.
    pub(crate) fn rank_of(&self, index: usize) -> u32 {
        self.nodes[index].layer as u32
    }

    fn has_scheduled_callbacks(&mut self) -> bool {
        !self.scheduled_callbacks.is_empty()
    }

    fn next_scheduled_time(&mut self) -> NanoTime {
        self.scheduled_callbacks.peek_time().unwrap_or(NanoTime::MAX)
    }

    pub(crate) fn add_callback_for_node(&mut self, node_index: usize, time: NanoTime) {
        let rank = self.rank_of(node_index);
        self.scheduled_callbacks.push(time, rank, node_index);
    }

    fn wait_ready_callback(&mut self, end_time: NanoTime) -> Option<usize> {
        let now = NanoTime::now();
        if now > end_time {
            None
        } else {
            let timeout = u64::from(end_time - now);
            select! {
                recv(self.ready_callbacks) -> msg => Some(msg.unwrap()),
                default(Duration::from_nanos(timeout)) => None,
            }
        }
    }

    pub fn node_index(&self, node: Rc<dyn Node>) -> Option<usize> {
        let key = HashByRef::new(node);
        self.node_to_index.get(&key).copied()
    }

    fn reset(&mut self) {
        for i in self.node_ticked.iter_mut() {
            *i = false;
        }
    }

    fn push_node(&mut self, node: Rc<dyn Node>) {
        let index = self.node_ticked.len();
        self.node_ticked.push(false);
        self.node_to_index.insert(HashByRef::new(node), index);
    }

    fn seen(&self, node: Rc<dyn Node>) -> bool {
        self.node_to_index.contains_key(&HashByRef::new(node))
    }

    fn set_ticked(&mut self, index: usize) {
        self.node_ticked[index] = true;
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn run_for(&self) -> RunFor {
        self.run_for
    }

    pub fn log(&self, level: log::Level, msg: &str) {
        if log_enabled!(level) {
            if let Some(ix) = self.current_node_index {
                let id = self.id;
                let type_name = &self.nodes[ix].node.type_name();
                log!(target: type_name, level, "[{id:},{ix:}]{msg:}");
            }
        }
    }

    pub(crate) fn mark_dirty(&mut self, index: usize) {
        if !self.node_dirty[index] {
            let layer = self.nodes[index].layer;
            self.dirty_nodes_by_layer[layer].push(index);
            self.node_dirty[index] = true;
        }
    }

    /// Registers a node built outside the static wiring pass (a
    /// [`crate::dynamic::Basket`] instance) and gives it a stable index,
    /// extending the dirty-tracking tables to cover its layer. The node
    /// gets no `upstreams`/`downstreams` from this call; link internal
    /// sub-graph edges explicitly with [`GraphState::wire_downstream`].
    pub(crate) fn register_dynamic_node(&mut self, node: Rc<dyn Node>, layer: usize) -> usize {
        let index = self.nodes.len();
        self.push_node(node.clone());
        self.nodes.push(NodeData {
            node,
            upstreams: vec![],
            downstreams: vec![],
            layer,
        });
        self.node_dirty.push(false);
        while self.dirty_nodes_by_layer.len() <= layer {
            self.dirty_nodes_by_layer.push(vec![]);
        }
        index
    }

    /// Links a dynamically-registered producer to a dynamically-registered
    /// consumer within the same sub-graph: the static wiring pass never
    /// sees either of them, so `Graph::initialise` never populates this
    /// edge on its own. An edge from a pre-existing static node into a
    /// freshly spawned sub-graph is out of scope for this call; see
    /// [`crate::dynamic::Basket`] for why.
    pub(crate) fn wire_downstream(&mut self, producer_index: usize, consumer_index: usize, active: bool) {
        self.nodes[producer_index].downstreams.push((consumer_index, active));
    }

    /// Runs `f` with `current_node_index` temporarily set to `index`, so a
    /// hook invoked on behalf of a node the graph didn't build through
    /// `initialise` (one of a `Basket`'s dynamically-instantiated roots)
    /// attributes any `add_callback`/`ready_notifier` call it makes to the
    /// right node instead of whatever node happens to be cycling.
    pub(crate) fn invoke_as(&mut self, index: usize, f: impl FnOnce(&mut GraphState)) {
        let previous = self.current_node_index;
        self.current_node_index = Some(index);
        f(self);
        self.current_node_index = previous;
    }
}

/// Engine for co-ordinating execution of [Node]s.
///
/// Build (`new`/`new_with`) and run (`run`) are strictly separated: ranks
/// are frozen once the graph is constructed, and a true cycle is rejected
/// at that point with [`BuildError::CycleDetected`]. A feedback edge never
/// participates in this check because it is never expressed as a
/// `upstreams()` dependency in the first place (see [`crate::ops::feedback_combine`]).
pub struct Graph {
    pub(crate) state: GraphState,
}

impl Graph {
    pub fn new(
        root_nodes: Vec<Rc<dyn Node>>,
        run_mode: RunMode,
        run_for: RunFor,
    ) -> Result<Graph, BuildError> {
        let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        Self::new_with(root_nodes, Arc::new(tokio_runtime), run_mode, run_for)
    }

    pub fn new_with(
        root_nodes: Vec<Rc<dyn Node>>,
        tokio_runtime: Arc<tokio::runtime::Runtime>,
        run_mode: RunMode,
        run_for: RunFor,
    ) -> Result<Graph, BuildError> {
        let state = GraphState::new(tokio_runtime, run_mode, run_for);
        let mut graph = Graph { state };
        graph.initialise(root_nodes)?;
        Ok(graph)
    }

    /// A handle that can be used, from any thread, to stop this graph once
    /// it is running.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            sender: self.state.stop_sender.clone(),
        }
    }

    pub(crate) fn setup_nodes(&mut self) {
        self.apply_nodes_forward_rank("setup", |node, state| node.setup(state));
    }

    pub(crate) fn start_nodes(&mut self) {
        self.apply_nodes_forward_rank("start", |node, state| node.start(state));
    }

    /// Runs `stop` in reverse rank order: a node must not be stopped
    /// before everything downstream of it has already stopped.
    pub(crate) fn stop_nodes(&mut self) {
        self.apply_nodes_reverse_rank("stop", |node, state| node.stop(state));
    }

    pub(crate) fn teardown_nodes(&mut self) {
        self.apply_nodes_reverse_rank("teardown", |node, state| node.teardown(state));
    }

    fn apply_nodes_forward_rank(&mut self, desc: &str, func: impl Fn(Rc<dyn Node>, &mut GraphState)) {
        let timer = Instant::now();
        for ix in 0..self.state.nodes.len() {
            self.invoke_on(ix, &func);
        }
        debug!(
            "graph {:?}, {:?} took {:?} for {:?} nodes",
            self.state.id,
            desc,
            timer.elapsed(),
            self.state.nodes.len()
        );
    }

    fn apply_nodes_reverse_rank(&mut self, desc: &str, func: impl Fn(Rc<dyn Node>, &mut GraphState)) {
        let timer = Instant::now();
        let mut order: Vec<usize> = (0..self.state.nodes.len()).collect();
        order.sort_by(|a, b| {
            self.state.nodes[*b]
                .layer
                .cmp(&self.state.nodes[*a].layer)
                .then(b.cmp(a))
        });
        for ix in order {
            self.invoke_on(ix, &func);
        }
        debug!(
            "graph {:?}, {:?} took {:?} for {:?} nodes",
            self.state.id,
            desc,
            timer.elapsed(),
            self.state.nodes.len()
        );
    }

    fn invoke_on(&mut self, ix: usize, func: &impl Fn(Rc<dyn Node>, &mut GraphState)) {
        let node = self.state.nodes[ix].node.clone();
        self.state.current_node_index = Some(ix);
        func(node, &mut self.state);
        self.state.current_node_index = None;
    }

    fn resolve_start_end(
        &self,
        start_time: &mut NanoTime,
        end_time: &mut NanoTime,
        end_cycle: &mut u32,
        is_realtime: &mut bool,
    ) {
        *end_time = NanoTime::MAX;
        *end_cycle = u32::MAX;
        match self.state.run_mode() {
            RunMode::RealTime => {
                *is_realtime = true;
                *start_time = NanoTime::now();
            }
            RunMode::HistoricalFrom(t) => {
                *is_realtime = false;
                *start_time = t;
            }
        };
        match self.state.run_for {
            RunFor::Duration(duration) => {
                *end_time = *start_time + duration.as_nanos() as u64;
                debug!("end_time = {end_time}");
            }
            RunFor::Cycles(cycle) => {
                *end_cycle = cycle;
                debug!("end_cycle = {end_cycle}");
            }
            RunFor::Forever => {}
        }
    }

    /// The cycle loop proper (§4.4, §4.7). Historical mode advances the
    /// clock to the next scheduled event and stops when the queue is
    /// empty or that event is past `end_time`; real-time mode tracks the
    /// wall clock, blocking on whichever comes first: a push-adapter
    /// notification or the next scheduled wakeup.
    pub(crate) fn run_nodes(&mut self) -> anyhow::Result<()> {
        let run_timer = Instant::now();
        let mut cycles: u32 = 0;
        let mut end_time = NanoTime::MAX;
        let mut end_cycle = u32::MAX;
        let mut is_realtime = false;
        let mut start_time = NanoTime::ZERO;
        self.resolve_start_end(&mut start_time, &mut end_time, &mut end_cycle, &mut is_realtime);
        self.state.start_time = start_time;
        self.state.time = start_time;
        loop {
            if let Some(result) = self.state.result.take() {
                return result;
            }
            if self.state.stop_receiver.try_recv().is_ok() {
                debug!("stop() received, terminating after current cycle");
                break;
            }
            if cycles >= end_cycle {
                break;
            }
            if is_realtime {
                let now = NanoTime::now();
                if now > end_time {
                    break;
                }
                if !self.process_callbacks_realtime(end_time) {
                    continue;
                }
            } else {
                if !self.state.has_scheduled_callbacks() {
                    debug!("queue empty, terminating");
                    break;
                }
                let next = self.state.next_scheduled_time();
                if next > end_time {
                    debug!("next scheduled event {next} past end_time {end_time}, terminating");
                    break;
                }
                if next < self.state.time {
                    let err = RuntimeFatal::TimeRegression {
                        got: next,
                        last: self.state.time,
                    };
                    error!("{err}");
                    return Err(err.into());
                }
                self.state.time = next;
                self.process_scheduled_callbacks();
            }
            self.state.is_last_cycle = cycles + 1 >= end_cycle
                || (!is_realtime
                    && (!self.state.has_scheduled_callbacks() || self.state.next_scheduled_time() > end_time));
            self.cycle();
            cycles += 1;
        }
        let elapsed = run_timer.elapsed();
        debug!("Completed {cycles:} cycles in {elapsed:?}.");
        Ok(())
    }

    /// Runs the graph to completion. A node handler that panics is caught
    /// here rather than left to unwind: §7's `RuntimeFatal` contract still
    /// wants every started node stopped, in reverse rank order, before
    /// `run` returns a failure.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.setup_nodes();
        self.start_nodes();
        let result = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.run_nodes())) {
            Ok(result) => result,
            Err(panic) => {
                let node = self
                    .state
                    .current_node_index
                    .map(|ix| self.state.nodes[ix].node.type_name())
                    .unwrap_or_else(|| "<unknown>".to_string());
                self.state.current_node_index = None;
                let err = RuntimeFatal::NodeHandler {
                    node,
                    source: anyhow::anyhow!(panic_message(panic)),
                };
                error!("{err}");
                Err(err.into())
            }
        };
        self.stop_nodes();
        self.teardown_nodes();
        result
    }

    fn initialise(&mut self, root_nodes: Vec<Rc<dyn Node>>) -> Result<(), BuildError> {
        let timer = Instant::now();
        let mut visiting: HashSet<HashByRef<dyn Node>> = HashSet::new();
        for node in root_nodes {
            if !self.state.seen(node.clone()) {
                self.initialise_node(&node, &mut visiting)?;
            }
        }
        let mut max_layer: i32 = -1;
        for i in 0..self.state.nodes.len() {
            max_layer = max(max_layer, self.state.nodes[i].layer.try_into().unwrap());
            self.state.node_dirty.push(false);
            for j in 0..self.state.nodes[i].upstreams.len() {
                let (up_index, active) = self.state.nodes[i].upstreams[j];
                self.state.nodes[up_index].downstreams.push((i, active));
            }
        }
        for _ in 0..max_layer + 1 {
            self.state.dirty_nodes_by_layer.push(vec![]);
        }
        debug!("{:} nodes wired in {:?}", self.state.nodes.len(), timer.elapsed());
        Ok(())
    }

    fn initialise_upstreams(
        &mut self,
        upstreams: &[Rc<dyn Node>],
        is_active: bool,
        layer: &mut usize,
        upstream_indexes: &mut Vec<(usize, bool)>,
        visiting: &mut HashSet<HashByRef<dyn Node>>,
    ) -> Result<(), BuildError> {
        for upstream_node in upstreams {
            let upstream_index = self.initialise_node(upstream_node, visiting)?;
            upstream_indexes.push((upstream_index, is_active));
            *layer = max(*layer, self.state.nodes[upstream_index].layer + 1);
        }
        Ok(())
    }

    /// Recursively wires `node`'s upstreams, assigning it an index and a
    /// layer (longest path from any source). `visiting` tracks the nodes
    /// currently on the recursion stack; re-entering one of them means the
    /// graph has a cycle that isn't broken by a feedback edge (a feedback
    /// edge never shows up here, since it is never returned from
    /// `upstreams()` in the first place).
    fn initialise_node(
        &mut self,
        node: &Rc<dyn Node>,
        visiting: &mut HashSet<HashByRef<dyn Node>>,
    ) -> Result<usize, BuildError> {
        if self.state.seen(node.clone()) {
            return Ok(self.state.node_index(node.clone()).unwrap());
        }
        let key = HashByRef::new(node.clone());
        if !visiting.insert(HashByRef::new(node.clone())) {
            return Err(BuildError::CycleDetected(node.to_string()));
        }
        let mut layer = 0;
        let mut upstream_indexes = vec![];
        let upstreams = node.upstreams();
        self.initialise_upstreams(&upstreams.active, true, &mut layer, &mut upstream_indexes, visiting)?;
        self.initialise_upstreams(&upstreams.passive, false, &mut layer, &mut upstream_indexes, visiting)?;
        let node_data = NodeData {
            node: node.clone(),
            upstreams: upstream_indexes,
            downstreams: vec![],
            layer,
        };
        let index = self.state.nodes.len();
        self.state.push_node(node.clone());
        self.state.nodes.push(node_data);
        visiting.remove(&key);
        Ok(index)
    }

    fn mark_dirty(&mut self, index: usize) {
        self.state.mark_dirty(index);
    }

    fn process_scheduled_callbacks(&mut self) {
        for i in 0..self.state.always_callbacks.len() {
            let ix = self.state.always_callbacks[i];
            self.mark_dirty(ix);
        }
        let now = self.state.time;
        while self.state.next_scheduled_time() == now {
            let (_, _, ix) = self.state.scheduled_callbacks.pop_earliest().unwrap();
            self.mark_dirty(ix);
        }
    }

    fn process_ready_callbacks(&mut self) -> bool {
        let mut progressed = false;
        while !self.state.ready_callbacks.is_empty() {
            let ix = self.state.ready_callbacks.recv().unwrap();
            self.mark_dirty(ix);
            progressed = true;
        }
        progressed
    }

    fn process_callbacks_realtime(&mut self, end_time: NanoTime) -> bool {
        let mut progressed = self.process_ready_callbacks();
        if self.state.has_scheduled_callbacks() && self.state.next_scheduled_time() <= self.state.time {
            self.process_scheduled_callbacks();
            progressed = true;
        }
        if !progressed {
            let wait_until = min(end_time, self.state.next_scheduled_time());
            if let Some(ix) = self.state.wait_ready_callback(wait_until) {
                self.mark_dirty(ix);
                progressed = true;
            }
        }
        self.state.time = NanoTime::now();
        progressed
    }

    /// Cycles every node marked dirty this timepoint, layer by layer
    /// (§4.5). A node that ticks marks its active downstreams dirty for
    /// the (strictly higher) layer they live in, so the frontier only
    /// ever grows forward and a single pass over `dirty_nodes_by_layer`
    /// sees every node that needs to run at this timepoint exactly once.
    /// The layer count is re-read every iteration rather than snapshotted
    /// up front: a [`crate::dynamic::Basket`] cycling in this same pass can
    /// call `register_dynamic_node` and grow the table past the length this
    /// loop started with.
    fn cycle(&mut self) {
        self.state.reset();
        let mut layer = 0;
        while layer < self.state.dirty_nodes_by_layer.len() {
            let indices = std::mem::take(&mut self.state.dirty_nodes_by_layer[layer]);
            for ix in indices {
                self.state.node_dirty[ix] = false;
                let node = self.state.nodes[ix].node.clone();
                self.state.current_node_index = Some(ix);
                let ticked = node.cycle(&mut self.state);
                self.state.current_node_index = None;
                if ticked {
                    self.state.set_ticked(ix);
                    let downstreams = self.state.nodes[ix].downstreams.clone();
                    for (down_ix, active) in downstreams {
                        if active {
                            self.mark_dirty(down_ix);
                        }
                    }
                }
            }
            layer += 1;
        }
    }

    pub fn print(&mut self) -> &mut Graph {
        for (i, node_data) in self.state.nodes.iter().enumerate() {
            print!("[{i:02}] ");
            for _ in 0..node_data.layer {
                print!("   ");
            }
            println!("{:}", node_data.node);
        }
        self
    }

    pub fn export(&self, path: &str) -> Result<(), Error> {
        let path = Path::new(&path);
        let mut output = File::create(path)?;
        writeln!(output, "graph [")?;
        for i in 0..self.state.nodes.len() {
            writeln!(output, "    node [")?;
            writeln!(output, "        id {i}")?;
            writeln!(output, "        label \"[{i}] {}\"", self.state.nodes[i].node)?;
            writeln!(output, "        graphics")?;
            writeln!(output, "        [")?;
            writeln!(output, "            w 200.0")?;
            writeln!(output, "            h 30.0")?;
            writeln!(output, "        ]")?;
            writeln!(output, "    ]")?;
        }
        for (i, node) in self.state.nodes.iter().enumerate() {
            for downstream in node.downstreams.iter() {
                let downstream_index = downstream.0;
                writeln!(output, "    edge [")?;
                writeln!(output, "        source {i}")?;
                writeln!(output, "        target {downstream_index}")?;
                writeln!(output, "    ]")?;
            }
        }
        writeln!(output, "]")
    }
}

/// Extracts a human-readable message from a caught panic payload, the
/// way `std::panic::set_hook`'s default handler does for `&str`/`String`
/// payloads, falling back to a generic label for anything else.
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "node handler panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::*;
    use crate::ops::*;
    use crate::queue::ValueAt;
    use crate::types::*;
    use std::cell::RefCell;

    use itertools::Itertools;

    #[test]
    fn historical_mode_works() {
        let num_inputs = 7;
        let inputs: Vec<Rc<RefCell<CallBackStream<i32>>>> = (0..num_inputs)
            .map(|_| Rc::new(RefCell::new(CallBackStream::new())))
            .collect();
        let captured = inputs
            .iter()
            .map(|stream| stream.clone().as_stream().distinct())
            .tree_fold1(|a, b| add(&a, &b))
            .unwrap()
            .collect();
        let mut expected: Vec<ValueAt<i32>> = vec![];
        push_all(&inputs, ValueAt::new(1, NanoTime::new(100)));
        expected.push(ValueAt::new(7, NanoTime::new(100)));
        push_all(&inputs, ValueAt::new(1, NanoTime::new(200)));
        push_first(&inputs, ValueAt::new(2, NanoTime::new(300)));
        expected.push(ValueAt::new(8, NanoTime::new(300)));
        push_first(&inputs, ValueAt::new(2, NanoTime::new(400)));

        let run_mode = RunMode::HistoricalFrom(NanoTime::ZERO);
        Graph::new(vec![captured.clone().as_node()], run_mode, RunFor::Forever)
            .unwrap()
            .print()
            .run()
            .unwrap();
        assert_eq!(captured.peek_value(), expected);
    }

    fn push_all(inputs: &[Rc<RefCell<CallBackStream<i32>>>], value_at: ValueAt<i32>) {
        inputs.iter().for_each(|input| input.borrow_mut().push(value_at.clone()));
    }

    fn push_first(inputs: &[Rc<RefCell<CallBackStream<i32>>>], value_at: ValueAt<i32>) {
        inputs[0].borrow_mut().push(value_at);
    }

    #[test]
    fn cycle_without_feedback_is_rejected() {
        // N1 -> N2 -> N1, neither edge marked feedback: finalize() must
        // fail with CycleDetected rather than recurse forever.
        struct Looping {
            other: Option<Rc<dyn Node>>,
        }
        impl MutableNode for Looping {
            fn cycle(&mut self, _state: &mut GraphState) -> bool {
                false
            }
            fn upstreams(&self) -> UpStreams {
                match &self.other {
                    Some(n) => UpStreams::new(vec![n.clone()], vec![]),
                    None => UpStreams::none(),
                }
            }
        }

        let n1 = Rc::new(RefCell::new(Looping { other: None }));
        let n2: Rc<dyn Node> = Rc::new(RefCell::new(Looping {
            other: Some(n1.clone()),
        }));
        n1.borrow_mut().other = Some(n2.clone());
        let n1: Rc<dyn Node> = n1;

        let result = Graph::new(vec![n1, n2], RunMode::HistoricalFrom(NanoTime::ZERO), RunFor::Forever);
        assert!(matches!(result, Err(BuildError::CycleDetected(_))));
    }

    #[test]
    fn node_panic_surfaces_as_runtime_fatal_and_still_stops_started_nodes() {
        use crate::error::RuntimeFatal;

        struct Panicky;
        impl MutableNode for Panicky {
            fn cycle(&mut self, _state: &mut GraphState) -> bool {
                panic!("boom");
            }
            fn start(&mut self, state: &mut GraphState) {
                state.add_callback(state.time());
            }
        }

        let stopped = Rc::new(RefCell::new(false));
        struct Tracking {
            stopped: Rc<RefCell<bool>>,
        }
        impl MutableNode for Tracking {
            fn cycle(&mut self, _state: &mut GraphState) -> bool {
                false
            }
            fn stop(&mut self, _state: &mut GraphState) {
                *self.stopped.borrow_mut() = true;
            }
        }

        let panicky: Rc<dyn Node> = Rc::new(RefCell::new(Panicky));
        let tracking: Rc<dyn Node> = Rc::new(RefCell::new(Tracking { stopped: stopped.clone() }));

        let mut graph = Graph::new(
            vec![panicky, tracking],
            RunMode::HistoricalFrom(NanoTime::ZERO),
            RunFor::Forever,
        )
        .unwrap();

        let result = graph.run();
        assert!(matches!(
            result.unwrap_err().downcast_ref::<RuntimeFatal>(),
            Some(RuntimeFatal::NodeHandler { .. })
        ));
        assert!(*stopped.borrow(), "started nodes must still be stopped after a caught panic");
    }

    #[test]
    fn backward_scheduled_callback_is_time_regression() {
        use crate::error::RuntimeFatal;

        struct BackwardsScheduler;
        impl MutableNode for BackwardsScheduler {
            fn cycle(&mut self, _state: &mut GraphState) -> bool {
                false
            }
            fn start(&mut self, state: &mut GraphState) {
                state.add_callback(NanoTime::new(500));
            }
        }

        let node: Rc<dyn Node> = Rc::new(RefCell::new(BackwardsScheduler));
        let mut graph = Graph::new(vec![node], RunMode::HistoricalFrom(NanoTime::new(1_000)), RunFor::Forever).unwrap();

        let result = graph.run();
        assert!(matches!(
            result.unwrap_err().downcast_ref::<RuntimeFatal>(),
            Some(RuntimeFatal::TimeRegression { .. })
        ));
    }
}
