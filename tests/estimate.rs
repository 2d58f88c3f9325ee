use furniture_estimator::config::SortOrder;
use furniture_estimator::estimate::{EstimateRequest, nest_and_price};
use furniture_estimator::finish::{FinishTopology, FinishType};
use furniture_estimator::pricing::{DefaultPricing, LinkedProduct, PriceBook, PriceKey, PriceRecord, RateSource, SaleUnit};
use furniture_estimator::purchase::rolls_needed;
use furniture_estimator::solver::{NestingResult, Solver};
use furniture_estimator::templates::{LoftSpec, StandardTemplates, UnitSpec, UnitType};
use furniture_estimator::tiler::tile;
use furniture_estimator::types::{BandClass, BandGrade, BoardType, Grain, MaterialClass, Panel, PanelKind, SheetSpec};
use furniture_estimator::EstimateError;

const EPS: f64 = 1e-6;

fn ply18() -> MaterialClass {
    MaterialClass::new(BoardType::Plywood, 18)
}

fn standard_sheet() -> SheetSpec {
    SheetSpec::new(2440.0, 1220.0, 3.0, 10.0)
}

/// Bounds, kerf-separated non-overlap, utilization range and rotation
/// legality for every sheet.
fn assert_layout_valid(result: &NestingResult, panels: &[Panel]) {
    let sheet = result.sheet;
    for layout in &result.materials {
        assert!((0.0..=1.0).contains(&layout.utilization));
        for s in &layout.sheets {
            assert!((0.0..=1.0).contains(&s.utilization));
            for p in &s.placements {
                assert!(p.x >= sheet.margin - EPS && p.y >= sheet.margin - EPS, "{:?}", p);
                assert!(p.right() <= sheet.length - sheet.margin + EPS, "{:?}", p);
                assert!(p.bottom() <= sheet.width - sheet.margin + EPS, "{:?}", p);

                let panel = panels.iter().find(|x| x.id == p.panel_id).unwrap();
                if p.rotated {
                    assert!(panel.allow_rotate && panel.grain == Grain::None, "{} rotated", p.panel_id);
                    assert_eq!((p.placed_width, p.placed_height), (panel.height, panel.width));
                } else {
                    assert_eq!((p.placed_width, p.placed_height), (panel.width, panel.height));
                }
            }
            for (i, a) in s.placements.iter().enumerate() {
                for b in &s.placements[i + 1..] {
                    let apart = a.right() + sheet.kerf <= b.x + EPS
                        || b.right() + sheet.kerf <= a.x + EPS
                        || a.bottom() + sheet.kerf <= b.y + EPS
                        || b.bottom() + sheet.kerf <= a.y + EPS;
                    assert!(apart, "{:?} overlaps {:?}", a, b);
                }
            }
        }
    }
}

fn wardrobe_request() -> EstimateRequest {
    let mut request = EstimateRequest::default();
    request.sheet = standard_sheet();
    let unit = UnitSpec {
        label: "master".to_string(),
        unit: UnitType::Wardrobe,
        width: 1800.0,
        height: 2100.0,
        depth: 580.0,
        shutters: 3,
        shelves: 4,
        exposed_left: true,
        loft: Some(LoftSpec {
            height: 600.0,
            shutters: 3,
        }),
        edge_band: Some(BandClass::new(BandGrade::Thin, 22)),
        ..UnitSpec::default()
    };
    assert!(request.add_unit(&StandardTemplates, &unit));
    request
}

#[test]
fn single_side_panel_scenario() {
    let panels = vec![Panel::new("side", PanelKind::Side, 2000.0, 600.0, ply18())];
    let result = Solver::new(standard_sheet(), SortOrder::Area).solve(&panels).unwrap();

    assert_eq!(result.total_sheets(), 1);
    let sheet = &result.materials[0].sheets[0];
    assert_eq!(sheet.placements.len(), 1);
    let p = &sheet.placements[0];
    assert_eq!((p.x, p.y), (10.0, 10.0));
    assert!(!p.rotated);

    let expected = (2000.0 * 600.0) / (2420.0 * 1200.0);
    assert!((sheet.utilization - expected).abs() < EPS);
    assert!((sheet.utilization - 0.413).abs() < 0.001);
    assert!((sheet.waste_area - (2420.0 * 1200.0 - 2000.0 * 600.0)).abs() < EPS);
}

#[test]
fn oversize_panel_is_tiled_before_nesting() {
    let sheet = standard_sheet();
    let panels = vec![Panel::new("top", PanelKind::Top, 3000.0, 600.0, ply18())];

    let tiled = tile(&panels, sheet.usable_width(), sheet.usable_height());
    assert_eq!(tiled.len(), 2);
    assert_eq!((tiled[0].width, tiled[0].height), (2420.0, 600.0));
    assert_eq!((tiled[1].width, tiled[1].height), (580.0, 600.0));
    let tiled_area: f64 = tiled.iter().map(Panel::area).sum();
    assert_eq!(tiled_area, 3000.0 * 600.0);

    let mut request = EstimateRequest::new(panels);
    request.sheet = sheet;
    let estimate = nest_and_price(&request, &DefaultPricing).unwrap();
    let layout = &estimate.nesting.materials[0];
    let placed: usize = layout.sheets.iter().map(|s| s.placements.len()).sum();
    assert_eq!(placed, 2);
    assert!((layout.used_area - 3000.0 * 600.0).abs() < EPS);
    assert_layout_valid(&estimate.nesting, &tiled);
}

#[test]
fn edge_band_roll_scenario() {
    assert_eq!(rolls_needed(47.6, 0.05, 50.0), 1);
}

#[test]
fn pre_laminated_material_needs_no_finish() {
    let prelam = MaterialClass::new(BoardType::PreLaminatedParticleBoard, 18);
    let panels = vec![
        Panel::new("door", PanelKind::Door, 450.0, 700.0, prelam).with_quantity(2),
        Panel::new("side", PanelKind::Side, 560.0, 720.0, prelam).exposed_end(true),
        Panel::new("shelf", PanelKind::Shelf, 764.0, 540.0, prelam),
    ];
    let estimate = nest_and_price(&EstimateRequest::new(panels), &DefaultPricing).unwrap();

    assert_eq!(estimate.finishes.outer_area, 0.0);
    assert_eq!(estimate.finishes.inner_area, 0.0);
    assert_eq!(estimate.finishes.adhesive_bottles, 0);
    assert!(estimate.purchase.laminates.is_empty());
    assert!(estimate.purchase.adhesive.is_none());
    assert_eq!(estimate.purchase.boards[0].rate.value, 55.0);
}

#[test]
fn wardrobe_layout_conserves_area_per_material() {
    let request = wardrobe_request();
    let estimate = nest_and_price(&request, &DefaultPricing).unwrap();
    let tiled = tile(&request.panels, request.sheet.usable_width(), request.sheet.usable_height());

    assert_layout_valid(&estimate.nesting, &tiled);
    for layout in &estimate.nesting.materials {
        let input: f64 = tiled
            .iter()
            .filter(|p| p.material == layout.material)
            .map(Panel::total_area)
            .sum();
        assert!((layout.used_area - input).abs() < EPS, "{}", layout.material);

        let copies: u32 = tiled
            .iter()
            .filter(|p| p.material == layout.material)
            .map(|p| p.quantity)
            .sum();
        let placed: usize = layout.sheets.iter().map(|s| s.placements.len()).sum();
        assert_eq!(placed, copies as usize);
    }
}

#[test]
fn wardrobe_estimate_is_deterministic() {
    let request = wardrobe_request();
    let first = nest_and_price(&request, &DefaultPricing).unwrap();
    let second = nest_and_price(&request, &DefaultPricing).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn wardrobe_purchase_totals() {
    let mut request = wardrobe_request();
    request.finish = FinishTopology::new(FinishType::Acrylic);
    let estimate = nest_and_price(&request, &DefaultPricing).unwrap();
    let purchase = &estimate.purchase;

    assert_eq!(purchase.boards.len(), 2);
    for group in &purchase.boards {
        assert_eq!(group.sheet_count, estimate.nesting.sheet_count(&group.material));
        assert!(group.utilization_percent > 0.0 && group.utilization_percent <= 100.0);
    }

    assert_eq!(purchase.laminates.len(), 2);
    assert_eq!(purchase.laminates[0].finish, FinishType::Acrylic);
    assert_eq!(purchase.laminates[1].finish, FinishType::Laminate);
    assert_eq!(purchase.edge_bands.len(), 1);
    assert!(purchase.adhesive.is_some());

    let sum: f64 = purchase.boards.iter().map(|g| g.cost).sum::<f64>()
        + purchase.laminates.iter().map(|g| g.cost).sum::<f64>()
        + purchase.edge_bands.iter().map(|g| g.cost).sum::<f64>()
        + purchase.hardware.iter().map(|g| g.cost).sum::<f64>()
        + purchase.adhesive.as_ref().map_or(0.0, |a| a.cost);
    assert!((purchase.total_cost - sum).abs() < 0.005);
}

#[test]
fn price_chain_precedence_through_estimate() {
    let panels = vec![Panel::new("side", PanelKind::Side, 2000.0, 600.0, ply18())];
    let mut request = EstimateRequest::new(panels);
    request.finish = FinishTopology::pre_laminated();
    let key = PriceKey::Board(ply18());

    let linked = PriceRecord::linked(LinkedProduct {
        name: "BWP 18mm".to_string(),
        unit_price: 3840.0,
        unit: SaleUnit::Sheet,
    })
    .with_custom_price(80.0);
    let book = PriceBook::new().with(&key, linked);
    let group = &nest_and_price(&request, &book).unwrap().purchase.boards[0];
    assert_eq!(group.rate.source, RateSource::LinkedProduct);
    assert_eq!(group.rate.value, 120.0);
    assert_eq!(group.cost, 3840.0);

    let book = PriceBook::new().with(&key, PriceRecord::custom(80.0));
    let group = &nest_and_price(&request, &book).unwrap().purchase.boards[0];
    assert_eq!(group.rate.source, RateSource::Custom);
    assert_eq!(group.cost, 2560.0);

    let group = &nest_and_price(&request, &PriceBook::new()).unwrap().purchase.boards[0];
    assert_eq!(group.rate.source, RateSource::Default);
    assert_eq!(group.cost, 3040.0);
}

#[test]
fn missing_price_aborts_estimate() {
    let odd = MaterialClass::new(BoardType::Hdhmr, 7);
    let panels = vec![Panel::new("shelf", PanelKind::Shelf, 800.0, 400.0, odd)];
    let err = nest_and_price(&EstimateRequest::new(panels), &DefaultPricing).unwrap_err();
    assert_eq!(
        err,
        EstimateError::PriceUnavailable {
            key: "board:7mm hdhmr".to_string()
        }
    );
}

#[test]
fn grain_panels_never_rotate() {
    let panels = vec![
        Panel::new("veneer-door", PanelKind::Door, 1100.0, 450.0, ply18())
            .with_grain(Grain::Long)
            .with_quantity(6),
        Panel::new("shelf", PanelKind::Shelf, 400.0, 1100.0, ply18()).with_quantity(4),
    ];
    let request = EstimateRequest::new(panels.clone());
    let estimate = nest_and_price(&request, &DefaultPricing).unwrap();
    assert_layout_valid(&estimate.nesting, &panels);
}

#[test]
fn unmapped_kind_is_flagged_not_fatal() {
    let panels = vec![
        Panel::new("plinth", PanelKind::from("plinth"), 1200.0, 100.0, ply18()),
        Panel::new("door", PanelKind::Door, 450.0, 700.0, ply18()),
    ];
    let estimate = nest_and_price(&EstimateRequest::new(panels), &DefaultPricing).unwrap();
    assert_eq!(estimate.finishes.flagged, vec!["plinth".to_string()]);
    assert!(estimate.finishes.outer_area > 0.0);
}

#[test]
fn zero_purchase_unit_sizes_are_rejected() {
    let band = BandClass::new(BandGrade::Thin, 22);
    let door = Panel::new("door", PanelKind::Door, 600.0, 2000.0, ply18())
        .with_quantity(4)
        .with_edge_band(band, 2, 2);

    for field in ["standard_sheet_sqft", "edge_band_roll_m", "adhesive_coverage_sqft"] {
        let mut request = EstimateRequest::new(vec![door.clone()]);
        match field {
            "standard_sheet_sqft" => request.config.standard_sheet_sqft = 0.0,
            "edge_band_roll_m" => request.config.edge_band_roll_m = 0.0,
            _ => request.config.adhesive_coverage_sqft = 0.0,
        }
        let err = nest_and_price(&request, &DefaultPricing).unwrap_err();
        assert!(
            matches!(err, EstimateError::InvalidConfig(ref m) if m.contains(field)),
            "{}: {}",
            field,
            err
        );
    }

    let estimate = nest_and_price(&EstimateRequest::new(vec![door]), &DefaultPricing).unwrap();
    assert!(estimate.purchase.edge_bands[0].rolls_needed > 0);
    assert!(estimate.purchase.laminates.iter().all(|g| g.sheet_count > 0 && g.cost > 0.0));
    assert!(estimate.purchase.adhesive.is_some());
}

#[test]
fn larger_stock_sheets_cost_more_per_sheet() {
    let panels = vec![Panel::new("side", PanelKind::Side, 2000.0, 600.0, ply18())];
    let mut request = EstimateRequest::new(panels);
    request.finish = FinishTopology::pre_laminated();

    let standard = nest_and_price(&request, &DefaultPricing).unwrap();
    assert_eq!(standard.purchase.boards[0].cost, 3040.0);

    request.sheet = SheetSpec::new(3050.0, 1530.0, 3.0, 10.0);
    let large = nest_and_price(&request, &DefaultPricing).unwrap();
    let group = &large.purchase.boards[0];
    assert_eq!(group.sheet_count, 1);
    let expected = 95.0 * request.sheet.billed_sqft(32.0);
    assert!((group.cost - expected).abs() < 0.005, "{}", group.cost);
    assert!(group.cost > standard.purchase.boards[0].cost);

    // A per-sheet product still costs its sheet price on the larger stock.
    let book = PriceBook::new().with(
        &PriceKey::Board(ply18()),
        PriceRecord::linked(LinkedProduct {
            name: "BWP 10x5".to_string(),
            unit_price: 6000.0,
            unit: SaleUnit::Sheet,
        }),
    );
    let group = &nest_and_price(&request, &book).unwrap().purchase.boards[0];
    assert_eq!(group.cost, 6000.0);
}
