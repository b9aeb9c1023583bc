pub mod domain {
    pub mod models {
        pub mod archive;
        pub mod page;
        pub mod run;
        pub mod token;
    }
    pub mod external_apis {
        pub mod github;
    }
    pub mod ports;
}

pub mod application {
    pub mod services {
        pub mod extractors;
        pub mod pagination;
        pub mod session_with_retry;
    }
    pub mod use_cases {
        pub mod authenticate;
        pub mod extract_workflow_runs;
        pub mod summarize_workflow_runs;
    }
}

pub mod infrastructures {
    pub mod adapters {
        pub mod primary {
            pub mod cli;
        }
        pub mod secondary {
            pub mod external_apis {
                pub mod github;
            }
            pub mod storage {
                pub mod archive;
                pub mod csv_report;
                pub mod env_file;
            }
            pub mod system;
        }
    }
    pub mod config;
    pub mod telemetry;
}

#[cfg(test)]
mod testing;
