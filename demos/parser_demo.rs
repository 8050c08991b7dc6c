// Parses a handful of expressions and prints their trees.
//
// Run: cargo run --example parser_demo

use parseval::{parse, parse_with, Settings, Value};

fn main() {
    let samples = [
        "42.25",
        "`${product} costs ${price * count}`",
        "company.address.city",
        "(a, b) => a < b",
        "active ? { product, total: price * count } : null",
        "items[2]",
    ];

    for text in samples {
        println!("{text}");
        match parse(text) {
            Ok(Some(exp)) => println!("  {exp:?}"),
            Ok(None) => println!("  (empty)"),
            Err(e) => println!("  parse error at {}: {e}", e.index()),
        }
        println!();
    }

    // custom operators participate in parsing
    let mut settings = Settings::new();
    settings.add_binary_operator("in", |_l, _r| Ok(Value::Bool(false)));

    let text = "product in restricted";
    println!("{text}  (with a custom `in` operator)");
    match parse_with(text, &settings) {
        Ok(Some(exp)) => println!("  {exp:?}"),
        Ok(None) => println!("  (empty)"),
        Err(e) => println!("  parse error at {}: {e}", e.index()),
    }

    // errors carry the failing index
    let bad = "Company.5";
    if let Err(e) = parse(bad) {
        println!("\n{bad}\n  parse error at {}: {e}", e.index());
    }
}
