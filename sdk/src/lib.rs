// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

#![deny(warnings)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! This library creates, reads and validates ASiC signed document
//! containers. Containers hold data files and signatures, which are either
//! RFC 3161 time stamp tokens or XAdES signatures provided by an external
//! engine.
//!
//! # Example: Time stamping a file
//!
//! ```no_run
//! # use asic::Result;
//! use asic::{Container, TimeStampSigner};
//!
//! # fn main() -> Result<()> {
//! let ctx = asic::Context::new("my-app")
//!     .with_settings(r#"{"time_stamp": {"tsa_url": "http://timestamp.example.com"}}"#)?
//!     .initialize(None)?;
//!
//! let mut container = Container::create("report.asics", &ctx)?;
//! container.add_data_file("report.pdf", "application/pdf")?;
//! container.sign(&TimeStampSigner::new(), &ctx)?;
//! container.save()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Validating a container
//!
//! ```no_run
//! # use asic::Result;
//! # fn main() -> Result<()> {
//! let ctx = asic::initialize("my-app", None, None)?;
//!
//! let container = asic::Container::open("report.asics", &ctx)?;
//! for result in container.validate(&ctx) {
//!     for cause in result.causes() {
//!         println!("{}: {}", result.signature_id(), cause.description);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// The internal name of the asic-rs SDK.
pub const NAME: &str = "asic-rs";

/// The version of this asic-rs SDK.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use asic_crypto as crypto;
pub use asic_status_tracker as status_tracker;

mod container;
pub use container::Container;

mod context;
pub use context::{Context, InitCallback, IntoSettings};

mod data_file;
pub use data_file::{DataFile, DEFAULT_MEDIA_TYPE};

mod error;
pub use error::{Error, Result};

pub mod formats;
pub use formats::ContainerFormat;

pub mod manifest;

mod package;
pub use package::{Package, PackageEntry};

pub mod settings;
pub use settings::Settings;

mod signature;
pub use signature::{AdvancedSignature, AdvancedSignatureParser, Signature};

mod signature_tst;
pub use signature_tst::{TimestampSignature, ASIC_TST_PROFILE};

mod signer;
pub use signer::{Signer, TimeStampSigner};

mod validation_results;
pub use validation_results::{SignatureValidation, Verdict};

/// Returns the version of this library.
pub fn version() -> &'static str {
    VERSION
}

/// Creates and initializes a library context.
///
/// `user_agent` overrides the user agent sent to time stamp authorities.
/// See [`Context::initialize`] for how `on_ready` is called.
pub fn initialize(
    app_name: &str,
    user_agent: Option<&str>,
    on_ready: Option<InitCallback>,
) -> Result<Context> {
    let mut ctx = Context::new(app_name);
    if let Some(user_agent) = user_agent {
        ctx = ctx.with_user_agent(user_agent);
    }
    ctx.initialize(on_ready)
}

/// Releases a library context. See [`Context::terminate`].
pub fn terminate(ctx: Context) {
    ctx.terminate()
}
