use rbas_tsp::colony::{Colony, ColonyConfig};
use rbas_tsp::instance::TspInstance;
use rbas_tsp::runner::{RunReport, Runner, StopReason, StoppingPolicy};
use rbas_tsp::visualization::Visualizer;
use rbas_tsp::RankBasedAntSystem;

const HEXAGON: &str = "NAME : hex6
COMMENT : hexagon with rounded sides of 10
TYPE : TSP
DIMENSION : 6
EDGE_WEIGHT_TYPE : EUC_2D
NODE_COORD_SECTION
1 10 0
2 5 9
3 -5 9
4 -10 0
5 -5 -9
6 5 -9
EOF
";

fn solve(seed: u32, iterations: usize) -> (Colony<RankBasedAntSystem>, RunReport) {
    let instance = TspInstance::from_reader(HEXAGON.as_bytes()).unwrap();
    let config = ColonyConfig { seed, ..ColonyConfig::default() };
    let mut colony = Colony::rank_based(instance.world().unwrap(), config).unwrap();
    let report = Runner::new(StoppingPolicy::iterations(iterations))
        .unwrap()
        .run(&mut colony, &instance.name, |_| {})
        .unwrap();
    (colony, report)
}

#[test]
fn test_hexagon_perimeter_is_found() {
    let (colony, report) = solve(42, 60);

    assert_eq!(report.greedy_distance, 60.0);
    assert_eq!(report.best.length, 60.0);
    assert_eq!(report.stop_reason, StopReason::MaxIterations);
    assert!(report.best.is_complete(colony.world()));
    assert_eq!(report.best.tour[0], 0);
    assert_eq!(report.logs.len(), 60);
}

#[test]
fn test_runs_are_reproducible() {
    let (first, a) = solve(7, 25);
    let (second, b) = solve(7, 25);

    assert_eq!(a.best.tour, b.best.tour);
    assert_eq!(first.pheromones().as_slice(), second.pheromones().as_slice());
    for (x, y) in a.logs.iter().zip(&b.logs) {
        assert_eq!(x.iteration_best, y.iteration_best);
        assert_eq!(x.global_best, y.global_best);
    }
}

#[test]
fn test_report_serializes_and_renders() {
    let instance = TspInstance::from_reader(HEXAGON.as_bytes()).unwrap();
    let (_, report) = solve(1, 10);

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"instance\":\"hex6\""));
    assert!(json.contains("\"variant\":\"RBAS\""));

    let viz = Visualizer::new();
    assert!(viz.generate_tour_svg(&instance, &report.best).contains("<polygon"));
    assert!(viz.generate_convergence_svg(&instance.name, &report.logs).contains("10 iterations"));
}
