use common::ProductId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CommissionSplit, Money, OrderLine, OrderTotals};

fn bench_commission_split(c: &mut Criterion) {
    c.bench_function("domain/commission_split", |b| {
        let gross = Money::from_cents(123_456);
        b.iter(|| CommissionSplit::of(std::hint::black_box(gross)));
    });
}

fn bench_line_commission(c: &mut Criterion) {
    let line = OrderLine {
        product_id: ProductId::new(),
        name: "Benchmark Widget".to_string(),
        image: String::new(),
        unit_price: Money::from_cents(1_999),
        quantity: 7,
    };

    c.bench_function("domain/line_commission", |b| {
        b.iter(|| std::hint::black_box(&line).commission());
    });
}

fn bench_totals_computed_total(c: &mut Criterion) {
    let totals = OrderTotals {
        items_price: Money::from_cents(200_000),
        tax_price: Money::from_cents(32_000),
        shipping_price: Money::from_cents(5_000),
        discount_price: Money::from_cents(10_000),
        total_price: Money::from_cents(227_000),
    };

    c.bench_function("domain/totals_computed_total", |b| {
        b.iter(|| std::hint::black_box(&totals).computed_total());
    });
}

criterion_group!(
    benches,
    bench_commission_split,
    bench_line_commission,
    bench_totals_computed_total
);
criterion_main!(benches);
