pub mod tezos;
