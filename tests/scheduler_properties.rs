//! Property tests for the wave scheduler and geometric formatters.
//!
//! Invariants:
//! 1. Acyclic graphs complete, every unit runs once, after its dependencies
//! 2. A cycle stalls the session; the pending list is the cycle plus
//!    everything depending on it, in registration order
//! 3. Session progress never decreases and ends at exactly 1.0
//! 4. Geometric values survive encoding bit for bit, and shorter or longer
//!    arrays decode positionally

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use proptest::prelude::*;
use worldsync::prelude::*;

struct DiscardSender;

impl PacketSender for DiscardSender {
    fn send(&self, _message: Message) -> Result<(), TransportError> {
        Ok(())
    }
}

struct Node {
    id: String,
    deps: Vec<String>,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SyncUnit<()> for Node {
    fn id(&self) -> UnitId {
        UnitId::new(self.id.clone())
    }

    fn dependencies(&self) -> Vec<UnitId> {
        self.deps.iter().cloned().map(UnitId::new).collect()
    }

    async fn run(&self, _snapshot: &(), _ctx: &mut SyncContext<'_>) -> Result<(), UnitError> {
        self.log.lock().unwrap().push(self.id.clone());
        Ok(())
    }
}

fn name(index: usize) -> String {
    format!("unit-{index}")
}

/// `n` units where unit `i` may depend only on units `j < i`, plus a
/// registration order.
fn acyclic_graph() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<usize>)> {
    (1usize..12).prop_flat_map(|n| {
        (
            prop::collection::vec(prop::collection::vec(any::<bool>(), n), n),
            Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
        )
            .prop_map(|(matrix, order)| {
                let deps = matrix
                    .iter()
                    .enumerate()
                    .map(|(i, row)| (0..i).filter(|&j| row[j]).collect())
                    .collect();
                (deps, order)
            })
    })
}

struct Outcome {
    result: Result<SyncReport, SyncError>,
    log: Vec<String>,
    fractions: Vec<f32>,
}

fn run_graph(deps: &[Vec<usize>], order: &[usize]) -> Outcome {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = UnitRegistry::new();
    for &index in order {
        registry
            .register(Node {
                id: name(index),
                deps: deps[index].iter().map(|&dep| name(dep)).collect(),
                log: Arc::clone(&log),
            })
            .unwrap();
    }

    let codec = PacketCodec::new(Arc::new(FormatterRegistry::standard()));
    let outbox = Outbox::new(codec, Arc::new(DiscardSender));
    let config = SyncConfig::default().with_yield_between_waves(false);
    let mut progress = ProgressRecorder::new();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let result = runtime.block_on(SyncSession::new((), &registry, &outbox, &config).run(&mut progress));

    let log = log.lock().unwrap().clone();
    Outcome {
        result,
        log,
        fractions: progress.session_fractions(),
    }
}

proptest! {
    /// Acyclic graphs complete with every unit after its dependencies.
    #[test]
    fn prop_acyclic_graphs_complete((deps, order) in acyclic_graph()) {
        let outcome = run_graph(&deps, &order);
        let report = outcome.result.unwrap();

        prop_assert_eq!(outcome.log.len(), deps.len());
        let unique: BTreeSet<&String> = outcome.log.iter().collect();
        prop_assert_eq!(unique.len(), deps.len());

        let position: HashMap<&str, usize> = outcome
            .log
            .iter()
            .enumerate()
            .map(|(pos, id)| (id.as_str(), pos))
            .collect();
        for (unit, unit_deps) in deps.iter().enumerate() {
            for dep in unit_deps {
                prop_assert!(position[name(*dep).as_str()] < position[name(unit).as_str()]);
            }
        }

        let executed: Vec<&str> = report.executed.iter().map(UnitId::as_str).collect();
        let logged: Vec<&str> = outcome.log.iter().map(String::as_str).collect();
        prop_assert_eq!(executed, logged);
    }

    /// Progress is non-decreasing, one update per unit, ending at 1.0.
    #[test]
    fn prop_progress_monotonic((deps, order) in acyclic_graph()) {
        let outcome = run_graph(&deps, &order);
        prop_assert!(outcome.result.is_ok());

        prop_assert_eq!(outcome.fractions.len(), deps.len());
        prop_assert!(outcome.fractions.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(outcome.fractions.last().copied(), Some(1.0));
    }

    /// A cycle stalls the session and names exactly the blocked units.
    #[test]
    fn prop_cycles_stall(
        (mut deps, order) in acyclic_graph().prop_filter("need two units", |(deps, _)| deps.len() >= 2),
        cycle_seed in any::<prop::sample::Index>(),
        cycle_len in 2usize..5,
    ) {
        let n = deps.len();
        let len = cycle_len.min(n);
        let start = cycle_seed.index(n - len + 1);
        let cycle: Vec<usize> = (start..start + len).collect();
        for (pos, &unit) in cycle.iter().enumerate() {
            deps[unit].push(cycle[(pos + 1) % len]);
        }

        // Blocked: cycle members plus anything depending on a blocked unit.
        let mut blocked: BTreeSet<usize> = cycle.iter().copied().collect();
        loop {
            let grown: BTreeSet<usize> = (0..n)
                .filter(|unit| blocked.contains(unit) || deps[*unit].iter().any(|d| blocked.contains(d)))
                .collect();
            if grown == blocked {
                break;
            }
            blocked = grown;
        }

        let outcome = run_graph(&deps, &order);
        let err = outcome.result.unwrap_err();
        let pending = err.pending_units().unwrap();

        let expected: Vec<String> = order
            .iter()
            .filter(|unit| blocked.contains(unit))
            .map(|&unit| name(unit))
            .collect();
        let pending: Vec<String> = pending.iter().map(UnitId::to_string).collect();
        prop_assert_eq!(pending, expected);

        for unit in &blocked {
            prop_assert!(!outcome.log.contains(&name(*unit)));
        }
        prop_assert_eq!(outcome.log.len(), n - blocked.len());
    }

    /// Finite quaternions survive encoding bit for bit.
    #[test]
    fn prop_quaternion_bit_exact(
        x in any::<f32>().prop_filter("finite", |v| v.is_finite()),
        y in any::<f32>().prop_filter("finite", |v| v.is_finite()),
        z in any::<f32>().prop_filter("finite", |v| v.is_finite()),
        w in any::<f32>().prop_filter("finite", |v| v.is_finite()),
    ) {
        let codec = PacketCodec::new(Arc::new(FormatterRegistry::standard()));
        let value = Quaternion::new(x, y, z, w);

        let bytes = codec.serialize(&value).unwrap();
        let decoded = codec.deserialize::<Quaternion>(&bytes).unwrap();
        prop_assert_eq!(
            [decoded.x.to_bits(), decoded.y.to_bits(), decoded.z.to_bits(), decoded.w.to_bits()],
            [x.to_bits(), y.to_bits(), z.to_bits(), w.to_bits()]
        );
    }

    /// Arrays of any length decode positionally into a color.
    #[test]
    fn prop_color_positional(slots in prop::collection::vec(-1.0f32..1.0, 0..8)) {
        let mut writer = WireWriter::new();
        writer.write_array_len(slots.len());
        for slot in &slots {
            writer.write_f32(*slot);
        }

        let codec = PacketCodec::new(Arc::new(FormatterRegistry::standard()));
        let color = codec.deserialize::<Color>(&writer.into_bytes()).unwrap();

        let slot = |i: usize| slots.get(i).copied().unwrap_or(0.0);
        prop_assert_eq!(color, Color::new(slot(0), slot(1), slot(2), slot(3)));
    }
}
