pub mod support;

mod expiry_boundary;
mod high_trust_single_source;
mod news_rejection;
mod normal_trust_corroboration;
mod out_of_region;
mod update_sequence;
