// Evaluates expressions against scope data, including a custom
// operator registry and a closure called from host code.
//
// Run: cargo run --example evaluator_demo

use parseval::coerce::to_number;
use parseval::{evaluate, evaluate_with, value, Settings, Value};

fn main() {
    let order = value!({
        "product": "Widget",
        "price": 10.5,
        "count": 3,
        "tags": ["new", "sale"],
    });

    let samples = [
        "price * count",
        "`${product}: ${price * count}`",
        "(count > 2) ? \"bulk\" : \"single\"",
        "tags.length",
        "tags[0]",
        "missing.field",
    ];

    for text in samples {
        match evaluate(text, std::slice::from_ref(&order)) {
            Ok(v) => println!("{text} = {v}"),
            Err(e) => println!("{text} failed: {e}"),
        }
    }

    // a custom low-precedence operator composes with the builtin ladder
    let mut settings = Settings::new();
    settings.add_binary_operator_with_precedence("mul", 0, |l, r| {
        Ok(Value::Number(to_number(&l) * to_number(&r)))
    });
    match evaluate_with("2 mul 3 + 5", &settings, &[]) {
        Ok(v) => println!("2 mul 3 + 5 = {v}"),
        Err(e) => println!("2 mul 3 + 5 failed: {e}"),
    }

    // expressions can produce closures the host calls directly
    let cheaper = evaluate("(a, b) => (a.price < b.price) ? a : b", &[]).unwrap();
    let cheaper = cheaper.as_function().unwrap();
    let a = value!({ "product": "Widget", "price": 10.5 });
    let b = value!({ "product": "Gadget", "price": 7.25 });
    let winner = cheaper.call(&[a, b]).unwrap();
    println!("cheaper = {winner}");
}
