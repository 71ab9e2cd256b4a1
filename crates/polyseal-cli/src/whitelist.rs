//! # Whitelist Subcommand
//!
//! Offline access to the recipient-whitelist tree, so operators can check
//! the root and path a prepared config will carry:
//!
//! ```text
//! polyseal whitelist root 0xaaaa... 0xbbbb...
//! polyseal whitelist prove --address 0xaaaa... 0xaaaa... 0xbbbb...
//! ```

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use polyseal_core::Address;
use polyseal_crypto::{
    CryptoError, Hash32, InclusionProof, MerkleTree, Sha256MerkleHasher, WhitelistTreeBuilder,
};

use crate::{EXIT_INVALID, EXIT_OK};

/// Arguments for the whitelist subcommand.
#[derive(Args, Debug)]
pub struct WhitelistArgs {
    #[command(subcommand)]
    pub command: WhitelistCommand,
}

#[derive(Subcommand, Debug)]
pub enum WhitelistCommand {
    /// Print the Merkle root of an address set.
    Root {
        /// Whitelisted addresses, any order and case.
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// Print the inclusion proof of one address.
    Prove {
        /// The address to prove.
        #[arg(long)]
        address: String,

        /// Whitelisted addresses, any order and case.
        #[arg(required = true)]
        addresses: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootOutput {
    pub root: Hash32,
    pub depth: u32,
    pub leaf_count: usize,
    pub hasher: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProveOutput {
    pub root: Hash32,
    #[serde(flatten)]
    pub proof: InclusionProof,
}

pub fn run_whitelist(args: &WhitelistArgs) -> Result<u8> {
    match &args.command {
        WhitelistCommand::Root { addresses } => {
            let Some(tree) = build_tree(addresses)? else {
                return Ok(EXIT_INVALID);
            };
            print_json(&root_output(&tree))?;
            Ok(EXIT_OK)
        }
        WhitelistCommand::Prove { address, addresses } => {
            let Some(tree) = build_tree(addresses)? else {
                return Ok(EXIT_INVALID);
            };
            let Some(target) = parse_addresses(std::slice::from_ref(address)) else {
                return Ok(EXIT_INVALID);
            };
            match tree.prove_inclusion(&target[0]) {
                Ok(proof) => {
                    print_json(&ProveOutput {
                        root: tree.root(),
                        proof,
                    })?;
                    Ok(EXIT_OK)
                }
                Err(CryptoError::NotFound(a)) => {
                    println!("FAIL: {a} is not in the whitelist");
                    Ok(EXIT_INVALID)
                }
                Err(e) => Err(e).context("failed to build inclusion proof"),
            }
        }
    }
}

pub fn root_output(tree: &MerkleTree) -> RootOutput {
    RootOutput {
        root: tree.root(),
        depth: tree.depth(),
        leaf_count: tree.leaf_count(),
        hasher: tree.hasher_id(),
    }
}

/// `None` (after printing the offending inputs) if any address is invalid.
fn parse_addresses(raw: &[String]) -> Option<Vec<Address>> {
    let mut parsed = Vec::with_capacity(raw.len());
    let mut ok = true;
    for value in raw {
        match Address::parse(value) {
            Ok(a) => parsed.push(a),
            Err(e) => {
                println!("FAIL: {e}");
                ok = false;
            }
        }
    }
    ok.then_some(parsed)
}

fn build_tree(raw: &[String]) -> Result<Option<MerkleTree>> {
    let Some(addresses) = parse_addresses(raw) else {
        return Ok(None);
    };
    let tree = WhitelistTreeBuilder::<Sha256MerkleHasher>::default()
        .build(&addresses)
        .context("failed to build whitelist tree")?;
    tracing::debug!(leaves = tree.leaf_count(), depth = tree.depth(), "whitelist tree built");
    Ok(Some(tree))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to render output")?
    );
    Ok(())
}
