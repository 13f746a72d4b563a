mod support;

use pca_coleta::error::{CollectionWarning, StallReason};
use pca_coleta::gate::SyncGate;
use pca_coleta::locator::Locator;
use pca_coleta::walker::{materialize, ListingWalker, PagedStrategy, VirtualizedScrollStrategy};

use support::{
    fast_scroll, fast_waits, paged_locators, scroll_locators, FakePagedDom, FakeScrollDom,
};

fn busy() -> Locator {
    Locator::css(".busy")
}

#[tokio::test]
async fn scroll_converges_in_minimal_rounds() {
    // 157 reported rows, 40 materialize per scroll: 4 rounds exactly.
    let dom = FakeScrollDom::new(157, 40);
    let gate = SyncGate::new(&dom, fast_waits(), busy());

    let mut walker = VirtualizedScrollStrategy::open(&gate, fast_scroll(6), "pendentes", scroll_locators())
        .await
        .unwrap();
    assert_eq!(walker.reported_total(), Some(157));

    let outcome = materialize(&mut walker).await.unwrap();
    assert_eq!(outcome.rows, 157);
    assert_eq!(dom.scroll_rounds(), 157usize.div_ceil(40));
    assert!(outcome.warnings.is_empty());
}

#[tokio::test]
async fn scroll_stagnation_terminates_with_warning() {
    // Growth plateaus at 80 of 157; three stagnant rounds end the walk.
    let dom = FakeScrollDom::new(157, 40).with_plateau(80);
    let gate = SyncGate::new(&dom, fast_waits(), busy());

    let mut walker = VirtualizedScrollStrategy::open(&gate, fast_scroll(3), "pendentes", scroll_locators())
        .await
        .unwrap();
    let outcome = materialize(&mut walker).await.unwrap();

    assert_eq!(outcome.rows, 80);
    assert_eq!(
        outcome.warnings,
        vec![CollectionWarning::PartialMaterialization {
            partition: "pendentes".to_string(),
            reported: 157,
            loaded: 80,
            reason: StallReason::Stagnation,
        }]
    );
}

#[tokio::test]
async fn scroll_short_circuits_when_already_loaded() {
    let dom = FakeScrollDom::new(0, 40);
    let gate = SyncGate::new(&dom, fast_waits(), busy());

    let mut walker = VirtualizedScrollStrategy::open(&gate, fast_scroll(6), "aprovadas", scroll_locators())
        .await
        .unwrap();
    let outcome = materialize(&mut walker).await.unwrap();

    assert_eq!(outcome.rows, 0);
    assert_eq!(dom.scroll_rounds(), 0);
    assert!(outcome.warnings.is_empty());
}

#[tokio::test]
async fn paged_walks_every_page_in_order() {
    let dom = FakePagedDom::new(vec![10, 10, 7]);
    let gate = SyncGate::new(&dom, fast_waits(), busy());

    let mut walker = PagedStrategy::open(&gate, "pgc", paged_locators()).await.unwrap();
    assert_eq!(walker.discovered_pages(), 3);
    assert_eq!(dom.current_page(), 1);

    let mut total_rows = 0;
    loop {
        total_rows += walker.current_rows().await.unwrap();
        if !walker.has_more().await.unwrap() {
            break;
        }
        walker.advance().await.unwrap();
    }

    assert_eq!(total_rows, 27);
    assert_eq!(dom.current_page(), 3);
    assert!(walker.take_warnings().is_empty());
}

#[tokio::test]
async fn paged_single_page_needs_no_paginator() {
    let dom = FakePagedDom::new(vec![4]);
    let gate = SyncGate::new(&dom, fast_waits(), busy());

    let mut walker = PagedStrategy::open(&gate, "pgc", paged_locators()).await.unwrap();
    assert_eq!(walker.discovered_pages(), 1);
    assert!(!walker.has_more().await.unwrap());
    assert_eq!(walker.current_rows().await.unwrap(), 4);
}

#[tokio::test]
async fn paged_shortfall_never_rereads_the_last_page() {
    // Same loop shape as the paged collectors: extract, then check, then
    // advance. A dead "next" must end the walk without counting the last
    // reachable page's rows a second time.
    let mut dom = FakePagedDom::new(vec![10, 10, 10, 10]);
    dom.next_breaks_after = Some(2);
    let gate = SyncGate::new(&dom, fast_waits(), busy());

    let mut walker = PagedStrategy::open(&gate, "pgc", paged_locators()).await.unwrap();
    let mut total_rows = 0;
    loop {
        total_rows += walker.current_rows().await.unwrap();
        if !walker.has_more().await.unwrap() {
            break;
        }
        walker.advance().await.unwrap();
    }

    assert_eq!(total_rows, 20);
    assert_eq!(walker.take_warnings().len(), 1);
}

#[tokio::test]
async fn paged_records_coverage_shortfall() {
    // Paginator advertises 4 pages but "next" dies after page 2.
    let mut dom = FakePagedDom::new(vec![10, 10, 10, 10]);
    dom.next_breaks_after = Some(2);
    let gate = SyncGate::new(&dom, fast_waits(), busy());

    let mut walker = PagedStrategy::open(&gate, "pgc", paged_locators()).await.unwrap();
    assert_eq!(walker.discovered_pages(), 4);

    while walker.has_more().await.unwrap() {
        walker.advance().await.unwrap();
    }

    assert_eq!(dom.current_page(), 2);
    assert_eq!(
        walker.take_warnings(),
        vec![CollectionWarning::PaginationCoverage {
            partition: "pgc".to_string(),
            discovered_pages: 4,
            walked_pages: 2,
        }]
    );
}
