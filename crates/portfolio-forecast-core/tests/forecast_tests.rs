use portfolio_forecast_core::catalog::{AssetUniverse, Plan, PlanCatalog, RiskTier};
use portfolio_forecast_core::config::{BandWidth, ForecastConfig};
use portfolio_forecast_core::forecast::{
    estimate_base_statistics, BaseStatistics, ForecastRequest, ForecastService,
};
use portfolio_forecast_core::portfolio::compose_portfolio;
use portfolio_forecast_core::projection::{calibrate, project_horizon, Horizon, Scenario};
use portfolio_forecast_core::statistics::{AssetHistory, AssetStatistics, CovarianceMatrix};
use portfolio_forecast_core::{ForecastError, ReturnFrequency};
use pretty_assertions::assert_eq;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::thread;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn wavy(id: &str, base: Decimal, amp: Decimal, phase: usize, n: usize) -> AssetHistory {
    let returns = (0..n)
        .map(|i| match (i + phase) % 4 {
            0 => base + amp,
            1 => base - amp,
            2 => base + amp / dec!(2),
            _ => base - amp / dec!(2),
        })
        .collect();
    AssetHistory::new(id, returns)
}

fn standard_universe(n: usize) -> Vec<AssetHistory> {
    vec![
        wavy("SPY", dec!(0.007), dec!(0.03), 0, n),
        wavy("QQQ", dec!(0.009), dec!(0.04), 1, n),
        wavy("AAPL", dec!(0.010), dec!(0.05), 2, n),
        wavy("MSFT", dec!(0.010), dec!(0.045), 3, n),
        wavy("NVDA", dec!(0.020), dec!(0.10), 0, n),
        wavy("AMZN", dec!(0.011), dec!(0.06), 1, n),
        wavy("GOOGL", dec!(0.010), dec!(0.05), 2, n),
        wavy("META", dec!(0.012), dec!(0.07), 3, n),
        wavy("TSLA", dec!(0.018), dec!(0.12), 0, n),
    ]
}

fn two_asset_catalog() -> PlanCatalog {
    PlanCatalog::new(
        "two-asset",
        AssetUniverse::new(["A", "B"]),
        vec![
            Plan::new("All A", RiskTier::Diversified, [("A", dec!(1))]),
            Plan::new("Even", RiskTier::Targeted, [("A", dec!(0.5)), ("B", dec!(0.5))]),
            Plan::new("Tilted", RiskTier::Concentrated, [("A", dec!(0.2)), ("B", dec!(0.8))]),
            Plan::new("All B", RiskTier::Aggressive, [("B", dec!(1))]),
        ],
    )
    .unwrap()
}

fn stat(asset: &str, mean: Decimal, variance: Decimal) -> AssetStatistics {
    AssetStatistics {
        asset: asset.into(),
        mean,
        variance,
        observations: 120,
    }
}

// ---------------------------------------------------------------------------
// End-to-end grid
// ---------------------------------------------------------------------------

#[test]
fn test_riskless_assets_compound_exactly() {
    let assets = vec![
        AssetHistory::new("A", vec![dec!(0.005); 24]),
        AssetHistory::new("B", vec![dec!(0.005); 24]),
    ];
    let svc = ForecastService::new(Arc::new(two_asset_catalog()), ForecastConfig::default()).unwrap();
    let grid = svc
        .forecast(&ForecastRequest {
            assets,
            frequency: ReturnFrequency::Monthly,
            initial_amount: None,
        })
        .unwrap()
        .result;

    let exact = dec!(1.005).powi(12);
    assert!((exact - dec!(1.0617)).abs() < dec!(0.0001));
    for plan in &grid.plans {
        let one_year = plan.horizon(Horizon::OneYear);
        assert_eq!(one_year.bands.realistic, exact);
        assert_eq!(one_year.bands.optimistic, exact);
        assert_eq!(one_year.bands.pessimistic, exact);
        assert_eq!(one_year.log_growth_std_dev, Decimal::ZERO);
    }
}

#[test]
fn test_bands_ordered_and_non_negative_everywhere() {
    let svc = ForecastService::standard().unwrap();
    let grid = svc
        .forecast(&ForecastRequest {
            assets: standard_universe(60),
            frequency: ReturnFrequency::Monthly,
            initial_amount: Some(dec!(10000)),
        })
        .unwrap()
        .result;

    assert!(grid.is_complete());
    for plan in &grid.plans {
        for h in &plan.horizons {
            let b = h.bands;
            assert!(b.optimistic >= b.realistic, "{} {}", plan.name, h.horizon);
            assert!(b.realistic >= b.pessimistic, "{} {}", plan.name, h.horizon);
            assert!(b.pessimistic >= Decimal::ZERO);
            assert_eq!(h.scenario(Scenario::Realistic).growth_factor, b.realistic);
        }
    }
}

#[test]
fn test_spread_widens_with_horizon() {
    let svc = ForecastService::standard().unwrap();
    let grid = svc
        .forecast(&ForecastRequest {
            assets: standard_universe(60),
            frequency: ReturnFrequency::Monthly,
            initial_amount: None,
        })
        .unwrap()
        .result;

    for plan in &grid.plans {
        let spreads: Vec<Decimal> = plan
            .horizons
            .iter()
            .map(|h| h.log_growth_std_dev)
            .collect();
        assert!(spreads.windows(2).all(|w| w[1] > w[0]), "{}", plan.name);
    }
}

#[test]
fn test_riskier_tiers_have_wider_bands() {
    let svc = ForecastService::standard().unwrap();
    let grid = svc
        .forecast(&ForecastRequest {
            assets: standard_universe(60),
            frequency: ReturnFrequency::Monthly,
            initial_amount: None,
        })
        .unwrap()
        .result;

    let diversified = grid.plan(RiskTier::Diversified).unwrap();
    let aggressive = grid.plan(RiskTier::Aggressive).unwrap();
    assert!(aggressive.statistics.volatility > diversified.statistics.volatility);
    let h = Horizon::TenYears;
    assert!(
        aggressive.horizon(h).log_growth_std_dev > diversified.horizon(h).log_growth_std_dev
    );
}

#[test]
fn test_confidence_band_width_widens_bands() {
    let request = ForecastRequest {
        assets: standard_universe(36),
        frequency: ReturnFrequency::Monthly,
        initial_amount: None,
    };
    let narrow = ForecastService::standard().unwrap().forecast(&request).unwrap().result;

    let config = ForecastConfig {
        band_width: BandWidth::Confidence { level: dec!(0.95) },
        ..ForecastConfig::default()
    };
    let catalog = Arc::new(PlanCatalog::standard().unwrap());
    let wide = ForecastService::new(catalog, config)
        .unwrap()
        .forecast(&request)
        .unwrap()
        .result;

    assert_eq!(wide.band_k, dec!(1.959964));
    let n = narrow.plan(RiskTier::Targeted).unwrap().horizon(Horizon::FiveYears);
    let w = wide.plan(RiskTier::Targeted).unwrap().horizon(Horizon::FiveYears);
    assert_eq!(n.bands.realistic, w.bands.realistic);
    assert!(w.bands.optimistic > n.bands.optimistic);
    assert!(w.bands.pessimistic < n.bands.pessimistic);
}

#[test]
fn test_partial_grid_when_asset_missing() {
    let assets: Vec<AssetHistory> = standard_universe(24)
        .into_iter()
        .filter(|h| h.id != "AMZN")
        .collect();
    let out = ForecastService::standard()
        .unwrap()
        .forecast(&ForecastRequest {
            assets,
            frequency: ReturnFrequency::Monthly,
            initial_amount: None,
        })
        .unwrap();

    let grid = &out.result;
    assert_eq!(grid.plans.len(), 3);
    assert_eq!(grid.cells().count(), 3 * 6 * 3);
    assert!(grid.plan(RiskTier::Aggressive).is_some());
    let failure = grid.failure(RiskTier::Concentrated).unwrap();
    assert_eq!(failure.missing_asset.as_deref(), Some("AMZN"));
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn test_misaligned_histories_fail_whole_request() {
    let mut assets = standard_universe(24);
    assets[0].returns.pop();
    let res = ForecastService::standard().unwrap().forecast(&ForecastRequest {
        assets,
        frequency: ReturnFrequency::Monthly,
        initial_amount: None,
    });
    assert!(matches!(res, Err(ForecastError::InvalidInput { .. })));
}

#[test]
fn test_impossible_return_fails_whole_request() {
    let mut assets = standard_universe(24);
    assets[2].returns[3] = dec!(-1.5);
    let res = ForecastService::standard().unwrap().forecast(&ForecastRequest {
        assets,
        frequency: ReturnFrequency::Monthly,
        initial_amount: None,
    });
    match res {
        Err(ForecastError::InvalidInput { field, .. }) => assert_eq!(field, "assets.AAPL.returns"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_integrity_failure_aborts_instead_of_partial_grid() {
    let svc = ForecastService::new(Arc::new(two_asset_catalog()), ForecastConfig::default()).unwrap();
    let cov = CovarianceMatrix::from_parts(
        vec!["A".into(), "B".into()],
        vec![vec![dec!(0.0016), dec!(0)], vec![dec!(0), dec!(0.0025)]],
        dec!(0.000000000001),
    )
    .unwrap();
    // B's own variance disagrees with its covariance row; A alone is consistent
    let base = BaseStatistics {
        assets: vec![stat("A", dec!(0.004), dec!(0.0016)), stat("B", dec!(0.006), dec!(0.0036))],
        covariance: cov,
    };

    let res = svc.forecast_from_base(&base, ReturnFrequency::Monthly, None);
    assert!(matches!(res, Err(ForecastError::DataIntegrity(_))));
}

#[test]
fn test_forecast_from_base_matches_forecast() {
    let svc = ForecastService::standard().unwrap();
    let request = ForecastRequest {
        assets: standard_universe(36),
        frequency: ReturnFrequency::Monthly,
        initial_amount: Some(dec!(5000)),
    };
    let base = estimate_base_statistics(&request.assets, svc.config()).unwrap();
    let direct = svc.forecast(&request).unwrap().result;
    let reused = svc
        .forecast_from_base(&base, request.frequency, request.initial_amount)
        .unwrap()
        .result;
    assert_eq!(direct, reused);
}

#[test]
fn test_concurrent_requests_share_one_service() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ForecastService>();

    let svc = Arc::new(ForecastService::standard().unwrap());
    let request = Arc::new(ForecastRequest {
        assets: standard_universe(36),
        frequency: ReturnFrequency::Monthly,
        initial_amount: Some(dec!(2500)),
    });

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let svc = Arc::clone(&svc);
            let request = Arc::clone(&request);
            thread::spawn(move || svc.forecast(&request).unwrap().result)
        })
        .collect();
    let grids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for g in &grids[1..] {
        assert_eq!(g, &grids[0]);
    }
}

// ---------------------------------------------------------------------------
// Composition and projection
// ---------------------------------------------------------------------------

#[test]
fn test_uncorrelated_assets_use_diagonal_only() {
    let stats = vec![stat("A", dec!(0.01), dec!(0.04)), stat("B", dec!(0.02), dec!(0.09))];
    let cov = CovarianceMatrix::from_parts(
        vec!["A".into(), "B".into()],
        vec![vec![dec!(0.04), dec!(0)], vec![dec!(0), dec!(0.09)]],
        dec!(0.000000000001),
    )
    .unwrap();
    let plan = Plan::new("Mix", RiskTier::Targeted, [("A", dec!(0.6)), ("B", dec!(0.4))]);
    let p = compose_portfolio(&plan, &stats, &cov).unwrap();

    assert_eq!(p.mean, dec!(0.014));
    assert_eq!(p.variance, dec!(0.36) * dec!(0.04) + dec!(0.16) * dec!(0.09));
}

#[test]
fn test_two_asset_plan_sits_between_its_components() {
    let stats = vec![stat("A", dec!(0.004), dec!(0.0016)), stat("B", dec!(0.006), dec!(0.0016))];
    let cov = CovarianceMatrix::from_correlations(
        vec!["A".into(), "B".into()],
        &[dec!(0.0016), dec!(0.0016)],
        &[vec![dec!(1), dec!(0.5)], vec![dec!(0.5), dec!(1)]],
        dec!(0.000000000001),
    )
    .unwrap();
    let config = ForecastConfig::default();

    let realistic_10y = |plan: &Plan| {
        let p = compose_portfolio(plan, &stats, &cov).unwrap();
        let dist = project_horizon(
            &p,
            Horizon::TenYears,
            ReturnFrequency::Monthly,
            config.log_growth_policy,
        )
        .unwrap();
        (p, calibrate(&dist, Decimal::ONE, Decimal::ZERO).unwrap().realistic)
    };

    let (only_a, a) = realistic_10y(&Plan::new("A", RiskTier::Diversified, [("A", dec!(1))]));
    let (only_b, b) = realistic_10y(&Plan::new("B", RiskTier::Aggressive, [("B", dec!(1))]));
    let (even, mix) = realistic_10y(&Plan::new(
        "Even",
        RiskTier::Targeted,
        [("A", dec!(0.5)), ("B", dec!(0.5))],
    ));

    assert_eq!(even.mean, dec!(0.005));
    assert!((even.variance - dec!(0.0012)).abs() < dec!(0.0000001));
    assert!(even.variance < only_a.variance.min(only_b.variance));
    assert!(a < mix && mix < b, "A {a}, mix {mix}, B {b}");
}
