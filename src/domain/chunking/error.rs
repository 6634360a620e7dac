#[derive(Debug, thiserror::Error)]
pub enum ChunkingError {
    #[error("byte budget of {budget} is too small to hold any content")]
    BudgetTooSmall { budget: usize },

    #[error("<{kind}> element cannot be split to fit the byte budget")]
    Unsplittable { kind: &'static str },

    #[error("heuristic splitting produced an unparseable chunk")]
    HeuristicFailed,
}
