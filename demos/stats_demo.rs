use clap::Parser;
use clap::ValueEnum;
use dense_robin::ChunkedArrayStore;
use dense_robin::EntryStore;
use dense_robin::HashMap;
use dense_robin::KeyStrategy;
use dense_robin::strategy::Fibonacci;
use dense_robin::strategy::Natural;
use dense_robin::strategy::RawInteger;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Natural,
    Fibonacci,
    Raw,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StoreArg {
    Single,
    Chunked,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "entries", default_value_t = 100_000)]
    entries: u64,

    /// Multiplier applied to each key before insertion, to simulate strided ids.
    #[arg(short = 's', long = "stride", default_value_t = 1)]
    stride: u64,

    /// Fraction of entries to remove and reinsert under fresh keys afterwards.
    #[arg(short = 'c', long = "churn", default_value_t = 0.0)]
    churn: f64,

    #[arg(long = "strategy", value_enum, default_value_t = StrategyArg::Natural)]
    strategy: StrategyArg,

    #[arg(long = "store", value_enum, default_value_t = StoreArg::Single)]
    store: StoreArg,
}

fn fill<S, E>(args: &Args, strategy: S)
where
    S: KeyStrategy<u64>,
    E: EntryStore<u64, u64>,
{
    let mut map: HashMap<u64, u64, S, E> = HashMap::with_strategy(strategy);

    println!(
        "Inserting {} keys with stride {} ({:?} strategy, {:?} store)...",
        args.entries, args.stride, args.strategy, args.store
    );
    for i in 0..args.entries {
        map.insert(i.wrapping_mul(args.stride), i);
    }

    let churned = (args.entries as f64 * args.churn) as u64;
    if churned > 0 {
        println!("Churning {} keys...", churned);
        for i in 0..churned {
            map.remove(&i.wrapping_mul(args.stride));
            map.insert((args.entries + i).wrapping_mul(args.stride), i);
        }
    }

    println!("Entries: {}", map.len());
    println!("Capacity: {} slots", map.capacity());
    println!(
        "Final load factor: {:.2}%",
        (map.len() as f64 / map.capacity() as f64) * 100.0
    );
    println!("Entry store next index: {}", map.entry_store().next_index());

    map.slot_table().print_probe_histogram();
    map.debug_stats().print();
}

fn main() {
    let args = Args::parse();

    match (args.strategy, args.store) {
        (StrategyArg::Natural, StoreArg::Single) => {
            fill::<Natural, dense_robin::SingleArrayStore<u64, u64>>(&args, Natural::default())
        }
        (StrategyArg::Natural, StoreArg::Chunked) => {
            fill::<Natural, ChunkedArrayStore<u64, u64>>(&args, Natural::default())
        }
        (StrategyArg::Fibonacci, StoreArg::Single) => {
            fill::<_, dense_robin::SingleArrayStore<u64, u64>>(&args, Fibonacci)
        }
        (StrategyArg::Fibonacci, StoreArg::Chunked) => {
            fill::<_, ChunkedArrayStore<u64, u64>>(&args, Fibonacci)
        }
        (StrategyArg::Raw, StoreArg::Single) => {
            fill::<_, dense_robin::SingleArrayStore<u64, u64>>(&args, RawInteger)
        }
        (StrategyArg::Raw, StoreArg::Chunked) => {
            fill::<_, ChunkedArrayStore<u64, u64>>(&args, RawInteger)
        }
    }
}
