#![doc(issue_tracker_base_url = "https://github.com/oddbuf/oddbuf-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod api;
