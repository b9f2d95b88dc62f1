use gyp_rs::{BuildDocument, ResolverBuilder};
use std::time::{Duration, Instant};

fn bench<T>(label: &str, iterations: u32, mut f: impl FnMut() -> T) -> (Duration, T) {
    // Warmup
    for _ in 0..5 {
        std::hint::black_box(f());
    }

    let mut total = Duration::ZERO;
    let mut last = None;
    for _ in 0..iterations {
        let start = Instant::now();
        let result = f();
        total += start.elapsed();
        last = Some(result);
    }

    let avg = total / iterations;
    println!("{label:<45} {iterations:>6} iterations   avg {avg:>12.3?}   total {total:>12.3?}");
    (avg, last.unwrap())
}

fn main() {
    let source = std::fs::read_to_string("example.gyp")
        .expect("example.gyp not found — run from repo root");

    let iterations = 1000;

    println!("─── Performance: example.gyp ({} bytes) ───", source.len());
    println!();

    // 1. Full parse (literal + typed model + predicates)
    bench("BuildDocument::parse (full)", iterations, || {
        BuildDocument::parse(&source).unwrap()
    });

    // 2. Literal parse only (baseline)
    bench("literal::parse_literal (literal only)", iterations, || {
        gyp_rs::literal::parse_literal(&source).unwrap()
    });

    // 3. Target resolution per platform
    let document = BuildDocument::parse(&source).unwrap();
    for dest_os in ["linux", "win32", "darwin"] {
        let resolver = ResolverBuilder::new().dest_os(dest_os).unwrap().build();
        bench(&format!("resolve_target_config(libuv, {dest_os})"), iterations, || {
            resolver.resolve_target_config(&document, "libuv").unwrap()
        });
    }

    // 4. Predicate parsing only (every clause in the file)
    let predicates: Vec<String> = document
        .variables
        .iter()
        .chain(document.targets.iter().filter_map(|t| t.conditions.as_ref()))
        .flatten()
        .map(|clause| clause.predicate.clone())
        .collect();
    let count = predicates.len();
    bench(&format!("parse all {count} top-level predicates"), iterations, || {
        for predicate in &predicates {
            std::hint::black_box(gyp_rs::condition::parse_condition(predicate).unwrap());
        }
    });

    println!();
    println!("Done.");
}
