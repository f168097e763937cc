//! End-to-end reconciliation scenarios against the public engine API.

use std::collections::BTreeMap;

use proptest::prelude::*;
use stockroom_core::{
    CoreError, CustomerContact, Document, EngineConfig, IssueOutcome, LineItem, LocationId,
    Money, MovementFilter, MovementKind, ProductDraft, ReconciliationEngine,
};

// =============================================================================
// Fixtures
// =============================================================================

const SHOPS: [&str; 3] = ["Plouis", "Bagatelle", "Rhill"];

fn loc(name: &str) -> LocationId {
    LocationId::new(name)
}

/// Engine with one product priced at 1.00 and the given opening stock per shop.
fn engine_with_stock(stock: &[(&str, i64)]) -> (ReconciliationEngine, String) {
    let mut engine = ReconciliationEngine::new(EngineConfig::default()).unwrap();
    let product = engine
        .upsert_product(ProductDraft {
            sku: "P-1".into(),
            name: "Armchair".into(),
            category: "Furniture".into(),
            min_quantity: 1,
            price_cents: 100,
            ..Default::default()
        })
        .unwrap();
    for (shop, qty) in stock {
        engine
            .adjust_stock(&product.id, &loc(shop), *qty, "Opening count")
            .unwrap();
    }
    (engine, product.id)
}

fn line(product_id: &str, qty: i64) -> LineItem {
    LineItem::new(product_id, "P-1", "Armchair", qty, Money::from_cents(100))
}

fn quantities(engine: &ReconciliationEngine) -> BTreeMap<(String, LocationId), i64> {
    engine
        .stock()
        .iter()
        .flat_map(|p| {
            p.stocks
                .iter()
                .map(move |(location, qty)| ((p.id.clone(), location.clone()), *qty))
        })
        .filter(|(_, qty)| *qty != 0)
        .collect()
}

fn rows_for<'a>(
    engine: &'a ReconciliationEngine,
    filter: &'a MovementFilter,
) -> Vec<(MovementKind, LocationId, i64)> {
    engine
        .ledger()
        .query(filter)
        .map(|r| (r.kind, r.location.clone(), r.quantity_delta))
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn sale_then_edit_replaces_effect_and_spend() {
    let (mut engine, p) = engine_with_stock(&[("Plouis", 10)]);
    let x = loc("Plouis");
    let customer = CustomerContact::named("Mrs Ramdin");
    let by_ref = MovementFilter::new().reference("R-1");

    engine
        .issue(Document::sale("d1", "R-1", x.clone(), vec![line(&p, 5)]).with_customer(customer.clone()))
        .unwrap();
    assert_eq!(engine.stock().quantity(&p, &x), 5);
    assert_eq!(rows_for(&engine, &by_ref), vec![(MovementKind::Out, x.clone(), -5)]);
    assert_eq!(engine.customers().find(&customer).map(|c| c.lifetime_spend_cents), Some(500));

    let report = engine
        .issue(Document::sale("d1", "R-1", x.clone(), vec![line(&p, 3)]).with_customer(customer.clone()))
        .unwrap();
    assert_eq!(report.outcome, IssueOutcome::Replaced);
    assert_eq!(engine.stock().quantity(&p, &x), 7);
    assert_eq!(rows_for(&engine, &by_ref), vec![(MovementKind::Out, x.clone(), -3)]);
    assert_eq!(engine.customers().find(&customer).map(|c| c.lifetime_spend_cents), Some(300));
    assert_eq!(engine.customers().len(), 1);
}

#[test]
fn transfer_moves_stock_between_shops() {
    let (mut engine, p) = engine_with_stock(&[("Plouis", 20)]);
    let (x, y) = (loc("Plouis"), loc("Bagatelle"));

    engine
        .issue(Document::transfer("t1", "T-1", x.clone(), y.clone(), vec![line(&p, 8)]))
        .unwrap();

    assert_eq!(engine.stock().quantity(&p, &x), 12);
    assert_eq!(engine.stock().quantity(&p, &y), 8);
    assert_eq!(engine.stock().aggregate(&p), 20);

    let rows = rows_for(&engine, &MovementFilter::new().reference("T-1"));
    assert_eq!(
        rows,
        vec![(MovementKind::Out, x, -8), (MovementKind::In, y, 8)]
    );
}

#[test]
fn per_line_destinations_override_document_destination() {
    let (mut engine, p) = engine_with_stock(&[("Plouis", 20)]);
    let doc = Document::transfer(
        "t1",
        "T-2",
        loc("Plouis"),
        loc("Bagatelle"),
        vec![line(&p, 2), line(&p, 3).with_destination(loc("Rhill"))],
    );
    engine.issue(doc).unwrap();

    assert_eq!(engine.stock().quantity(&p, &loc("Plouis")), 15);
    assert_eq!(engine.stock().quantity(&p, &loc("Bagatelle")), 2);
    assert_eq!(engine.stock().quantity(&p, &loc("Rhill")), 3);
}

#[test]
fn duplicate_number_across_types_leaves_state_untouched() {
    let (mut engine, p) = engine_with_stock(&[("Plouis", 10)]);
    engine
        .issue(Document::sale("d1", "R-1", loc("Plouis"), vec![line(&p, 1)]))
        .unwrap();
    let before = engine.snapshot();

    let err = engine
        .issue(Document::refund(
            "d2",
            " r-1 ",
            loc("Plouis"),
            Default::default(),
            vec![line(&p, 4)],
        ))
        .unwrap_err();

    match err {
        CoreError::DuplicateDocumentNumber { existing_id, .. } => assert_eq!(existing_id, "d1"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(engine.snapshot(), before);
}

#[test]
fn removed_product_is_skipped_on_edit() {
    let (mut engine, p) = engine_with_stock(&[("Plouis", 10)]);
    engine
        .issue(Document::sale("d1", "R-1", loc("Plouis"), vec![line(&p, 2)]))
        .unwrap();
    engine.remove_product(&p).unwrap();

    let report = engine
        .issue(Document::sale("d1", "R-1", loc("Plouis"), vec![line(&p, 3)]))
        .unwrap();
    assert_eq!(report.warnings.len(), 1);
    let rows = rows_for(&engine, &MovementFilter::new().reference("R-1"));
    assert_eq!(rows, vec![(MovementKind::Adjust, loc("Plouis"), 0)]);
}

#[test]
fn restock_import_and_sale_keep_ledger_in_step_with_stock() {
    let (mut engine, p) = engine_with_stock(&[("Rhill", 4)]);
    let rhill = loc("Rhill");
    engine
        .import_restock(
            &[stockroom_core::ImportRow::new("P-1", "Armchair").with_quantity(9)],
            &rhill,
        )
        .unwrap();
    engine
        .issue(Document::sale("d1", "R-1", rhill.clone(), vec![line(&p, 2)]))
        .unwrap();

    assert_eq!(engine.stock().quantity(&p, &rhill), 7);
    assert_eq!(engine.ledger().net_delta(&p, &rhill), 7);
}

// =============================================================================
// Properties
// =============================================================================

#[derive(Debug, Clone)]
enum Version {
    Sale { shop: usize, qty: i64 },
    Transfer { from: usize, to: usize, qty: i64 },
}

fn version_strategy() -> impl Strategy<Value = Version> {
    prop_oneof![
        (0..SHOPS.len(), 1i64..50).prop_map(|(shop, qty)| Version::Sale { shop, qty }),
        (0..SHOPS.len(), 1..SHOPS.len(), 1i64..50).prop_map(|(from, offset, qty)| {
            Version::Transfer {
                from,
                to: (from + offset) % SHOPS.len(),
                qty,
            }
        }),
    ]
}

fn build(version: &Version, product_id: &str, number: &str) -> Document {
    match version {
        Version::Sale { shop, qty } => {
            Document::sale("doc", number, loc(SHOPS[*shop]), vec![line(product_id, *qty)])
                .with_customer(CustomerContact::named("Regular"))
        }
        Version::Transfer { from, to, qty } => Document::transfer(
            "doc",
            number,
            loc(SHOPS[*from]),
            loc(SHOPS[*to]),
            vec![line(product_id, *qty)],
        ),
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Any chain of edits followed by a cancel restores the opening stock,
    /// leaves no rows for the document and nets the customer spend to zero.
    #[test]
    fn edits_then_cancel_restore_opening_stock(
        versions in prop::collection::vec(version_strategy(), 1..8)
    ) {
        let (mut engine, p) = engine_with_stock(&[("Plouis", 30), ("Bagatelle", 5)]);
        let opening = quantities(&engine);

        for version in &versions {
            engine.issue(build(version, &p, "R-9")).unwrap();
        }
        engine.cancel("doc").unwrap();

        prop_assert_eq!(quantities(&engine), opening);
        prop_assert_eq!(
            engine.ledger().query(&MovementFilter::new().reference("R-9")).count(),
            0
        );
        let spend = engine
            .customers()
            .find(&CustomerContact::named("Regular"))
            .map(|c| c.lifetime_spend_cents)
            .unwrap_or(0);
        prop_assert_eq!(spend, 0);
    }

    /// After every issue the rows tagged with the number explain exactly the
    /// current version: outgoing units equal the line quantities, with no
    /// leftovers from earlier versions.
    #[test]
    fn ledger_rows_match_current_version(
        versions in prop::collection::vec(version_strategy(), 1..8)
    ) {
        let (mut engine, p) = engine_with_stock(&[("Plouis", 30)]);
        let by_ref = MovementFilter::new().reference("R-9");

        for version in &versions {
            let doc = build(version, &p, "R-9");
            let expected: i64 = doc.line_items.iter().map(|l| l.quantity).sum();
            engine.issue(doc).unwrap();

            let rows: Vec<_> = engine.ledger().query(&by_ref).cloned().collect();
            let out: i64 = rows
                .iter()
                .filter(|r| r.kind == MovementKind::Out)
                .map(|r| r.quantity())
                .sum();
            let incoming: i64 = rows
                .iter()
                .filter(|r| r.kind == MovementKind::In)
                .map(|r| r.quantity())
                .sum();
            prop_assert_eq!(out, expected);
            match version {
                Version::Sale { .. } => prop_assert_eq!(incoming, 0),
                Version::Transfer { .. } => prop_assert_eq!(incoming, expected),
            }
        }
    }

    /// Issuing identical content twice changes nothing the second time.
    #[test]
    fn reissue_is_idempotent(version in version_strategy()) {
        let (mut engine, p) = engine_with_stock(&[("Plouis", 30)]);
        let customer = CustomerContact::named("Regular");

        engine.issue(build(&version, &p, "R-9")).unwrap();
        let stock = quantities(&engine);
        let rows = engine.ledger().len();
        let spend = engine.customers().find(&customer).map(|c| c.lifetime_spend_cents);

        let report = engine.issue(build(&version, &p, "R-9")).unwrap();
        prop_assert_eq!(report.outcome, IssueOutcome::Replaced);
        prop_assert_eq!(quantities(&engine), stock);
        prop_assert_eq!(engine.ledger().len(), rows);
        prop_assert_eq!(
            engine.customers().find(&customer).map(|c| c.lifetime_spend_cents),
            spend
        );
    }
}
