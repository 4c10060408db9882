use ethereum_types::U256;

pub type Difficulty = U256;
