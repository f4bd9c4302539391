pub mod env {
    pub const BRIDGE_BIN: &str = "HERON_BRIDGE_BIN";
    pub const DOMAIN: &str = "HERON_DOMAIN";
    pub const USER_ID: &str = "HERON_USER_ID";
    pub const PRE_SHARED_KEY: &str = "HERON_PRE_SHARED_KEY";
    pub const IDENTITY_FILE: &str = "HERON_IDENTITY_FILE";
    pub const SSH_USER: &str = "HERON_SSH_USER";
    pub const LOCAL_PORT: &str = "HERON_LOCAL_PORT";
    pub const PYTHON_VERSION: &str = "HERON_PYTHON_VERSION";
    pub const INTERPRETER: &str = "HERON_INTERPRETER";
    pub const ENDPOINT_PATH: &str = "HERON_ENDPOINT_PATH";
    pub const PSK_COOKIE: &str = "HERON_PSK_COOKIE";
}

pub mod defaults {
    pub const SSH_USER: &str = "jovyan";
    pub const LOCAL_PORT: u16 = 2222;
    pub const ENDPOINT_PATH: &str = "/nb/{user_id}/default/api/ssh-over-ws";
    pub const PSK_COOKIE: &str = "matlantis-notebook-pre-shared-key";
}

pub mod layout {
    /// Remote directory holding one sub-directory per job.
    pub const REMOTE_JOBS_ROOT: &str = "~/heron-jobs";
    /// Remote staging area for transfer archives.
    pub const REMOTE_TMP_DIR: &str = ".heron/tmp";
    pub const LOG_FILE_NAME: &str = "execution.log";
    /// Directory created under the working directory for downloaded artifacts.
    pub const LOCAL_RUNS_DIR: &str = "heron_runs";
}

/// Names never shipped to the remote host.
pub const DEFAULT_IGNORE: &[&str] = &[
    ".git",
    ".venv",
    "__pycache__",
    ".ipynb_checkpoints",
    ".DS_Store",
    layout::LOCAL_RUNS_DIR,
];

pub mod routes {
    pub const HEALTH: &str = "/health";

    pub const JOBS: &str = "/jobs";
    pub const JOBS_STATUS: &str = "/jobs/status";
    pub const JOBS_RESULT: &str = "/jobs/result";
    pub const JOBS_WAIT: &str = "/jobs/wait";
}
