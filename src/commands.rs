pub mod bootstrap;
pub mod build_index;
pub mod build_link_graph;
pub mod build_vectorspace;
pub mod master;
pub mod serve_search;
pub mod status;
pub mod update_pagerank;
pub mod update_relevance;
pub mod worker;

use std::path::PathBuf;

use citysearch_core::config::GeneralConfig;

pub fn link_graph_path(cfg: &GeneralConfig) -> PathBuf {
    PathBuf::from(&cfg.data_dir).join("linkgraph.bin")
}

pub fn index_path(cfg: &GeneralConfig) -> PathBuf {
    PathBuf::from(&cfg.data_dir).join("invindex.bin")
}

pub fn vectorspace_path(cfg: &GeneralConfig) -> PathBuf {
    PathBuf::from(&cfg.data_dir).join("vectorspace.bin")
}
