//! Instruction payloads understood by the vault program.
//!
//! Two schema generations exist. [`SchemaVersion::V2`] is the vault program,
//! where every variant has its own compact layout. [`SchemaVersion::V1`] is the
//! user-info program, where variants 0 to 4 all carry the same eight field
//! record. The two number their variants independently.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, VaultClientError},
    layout::{self, Field, FieldKind, FieldValue, Layout},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// Vault seeded by `[name]`, user-info records.
    V1,
    /// Vault seeded by `["vault", name]`, per variant layouts.
    #[default]
    V2,
}

const NAME_AMOUNT: Layout = Layout {
    name: "name_amount",
    fields: &[Field::seed("name"), Field::new("amount", FieldKind::U64)],
};

const AMOUNT: Layout = Layout {
    name: "amount",
    fields: &[Field::new("amount", FieldKind::U64)],
};

const EMPTY: Layout = Layout {
    name: "empty",
    fields: &[],
};

const UPDATE_DELEGATE: Layout = Layout {
    name: "update_delegate",
    fields: &[
        Field::seed("name"),
        Field::new("delegate", FieldKind::Str),
        Field::new("sub_account", FieldKind::U16),
    ],
};

const BASE_VAULT: Layout = Layout {
    name: "base_vault",
    fields: &[
        Field::seed("name"),
        Field::new("lock_in_period", FieldKind::U64),
        Field::new("redeem_period", FieldKind::U64),
        Field::new("max_tokens", FieldKind::U64),
        Field::new("management_fee", FieldKind::U64),
        Field::new("min_deposit_amount", FieldKind::U64),
        Field::new("profit_share", FieldKind::U32),
        Field::new("hurdle_rate", FieldKind::U32),
        Field::new("spot_market_index", FieldKind::U16),
        Field::new("permissioned", FieldKind::Bool),
    ],
};

const UPDATE_VAULT: Layout = Layout {
    name: "update_vault",
    fields: &[
        Field::new("lock_in_period", FieldKind::U64),
        Field::new("redeem_period", FieldKind::U64),
        Field::new("max_tokens", FieldKind::U64),
        Field::new("management_fee", FieldKind::U64),
        Field::new("min_deposit_amount", FieldKind::U64),
        Field::new("profit_share", FieldKind::U32),
        Field::new("hurdle_rate", FieldKind::U32),
        Field::new("permissioned", FieldKind::Bool),
    ],
};

const USER_INFO: Layout = Layout {
    name: "user_info",
    fields: &[
        Field::seed("vault_id"),
        Field::seed("user_pubkey"),
        Field::new("amount", FieldKind::U64),
        Field::new("fund_status", FieldKind::Str),
        Field::new("bot_status", FieldKind::Str),
        Field::new("market_index", FieldKind::U16),
        Field::new("delegate", FieldKind::Str),
        Field::new("sub_account", FieldKind::U16),
    ],
};

/// Every instruction the client can build, whichever program receives it.
/// The wire tag depends on the schema; see [`InstructionKind::tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    InitializeVault,
    InitializeDrift,
    InitializeVaultWithDrift,
    InitializeVaultDepositor,
    Deposit,
    RequestWithdraw,
    CancelWithdrawRequest,
    Withdraw,
    UpdateDelegate,
    ManagerDeposit,
    ManagerWithdraw,
    ManagerCollectFees,
    UpdateVault,
    ResetDelegate,
}

impl InstructionKind {
    /// Discriminant byte under `schema`, or `UnsupportedSchema` when the
    /// program speaking `schema` has no such instruction.
    pub fn tag(self, schema: SchemaVersion) -> Result<u8> {
        use InstructionKind::*;
        let tag = match schema {
            SchemaVersion::V1 => match self {
                InitializeVault => Some(UserInfoAction::InitializeVault as u8),
                Deposit => Some(UserInfoAction::Deposit as u8),
                Withdraw => Some(UserInfoAction::Withdraw as u8),
                InitializeDrift => Some(UserInfoAction::InitializeDrift as u8),
                UpdateDelegate => Some(UserInfoAction::UpdateDelegate as u8),
                _ => None,
            },
            SchemaVersion::V2 => match self {
                InitializeVaultWithDrift => Some(0),
                InitializeVaultDepositor => Some(1),
                Deposit => Some(2),
                RequestWithdraw => Some(3),
                CancelWithdrawRequest => Some(4),
                Withdraw => Some(5),
                UpdateDelegate => Some(6),
                ManagerDeposit => Some(7),
                ManagerWithdraw => Some(8),
                ManagerCollectFees => Some(9),
                UpdateVault => Some(10),
                ResetDelegate => Some(11),
                InitializeVault | InitializeDrift => None,
            },
        };
        tag.ok_or(VaultClientError::UnsupportedSchema {
            instruction: self,
            schema,
        })
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Layout of the instruction tagged `variant` under `schema`.
pub fn layout_for(variant: u8, schema: SchemaVersion) -> Result<&'static Layout> {
    match schema {
        SchemaVersion::V1 => match variant {
            0..=4 => Ok(&USER_INFO),
            _ => Err(VaultClientError::UnknownVariant(variant)),
        },
        SchemaVersion::V2 => match variant {
            0 => Ok(&BASE_VAULT),
            1 | 4 | 5 | 11 => Ok(&EMPTY),
            2 | 7 => Ok(&NAME_AMOUNT),
            3 | 8 | 9 => Ok(&AMOUNT),
            6 => Ok(&UPDATE_DELEGATE),
            10 => Ok(&UPDATE_VAULT),
            _ => Err(VaultClientError::UnknownVariant(variant)),
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultParams {
    pub name: String,
    pub lock_in_period: u64,
    pub redeem_period: u64,
    pub max_tokens: u64,
    pub management_fee: u64,
    pub min_deposit_amount: u64,
    pub profit_share: u32,
    pub hurdle_rate: u32,
    pub spot_market_index: u16,
    pub permissioned: bool,
}

impl VaultParams {
    /// Parameters the api uses when it opens a vault on the lending protocol.
    pub fn with_defaults(name: &str, spot_market_index: u16) -> Self {
        Self {
            name: name.to_string(),
            management_fee: 100_000,
            min_deposit_amount: 1_000,
            profit_share: 100_000,
            spot_market_index,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateVaultParams {
    pub lock_in_period: u64,
    pub redeem_period: u64,
    pub max_tokens: u64,
    pub management_fee: u64,
    pub min_deposit_amount: u64,
    pub profit_share: u32,
    pub hurdle_rate: u32,
    pub permissioned: bool,
}

/// Instructions of the vault program, in wire tag order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultInstruction {
    InitializeVaultWithDrift(VaultParams),
    InitializeVaultDepositor,
    Deposit { name: String, amount: u64 },
    RequestWithdraw { amount: u64 },
    CancelWithdrawRequest,
    /// Redeems whatever the last request left withdrawable.
    Withdraw,
    UpdateDelegate { name: String, delegate: String, sub_account: u16 },
    ManagerDeposit { name: String, amount: u64 },
    ManagerWithdraw { amount: u64 },
    ManagerCollectFees { amount: u64 },
    UpdateVault(UpdateVaultParams),
    ResetDelegate,
}

impl VaultInstruction {
    pub fn kind(&self) -> InstructionKind {
        match self {
            VaultInstruction::InitializeVaultWithDrift(_) => InstructionKind::InitializeVaultWithDrift,
            VaultInstruction::InitializeVaultDepositor => InstructionKind::InitializeVaultDepositor,
            VaultInstruction::Deposit { .. } => InstructionKind::Deposit,
            VaultInstruction::RequestWithdraw { .. } => InstructionKind::RequestWithdraw,
            VaultInstruction::CancelWithdrawRequest => InstructionKind::CancelWithdrawRequest,
            VaultInstruction::Withdraw => InstructionKind::Withdraw,
            VaultInstruction::UpdateDelegate { .. } => InstructionKind::UpdateDelegate,
            VaultInstruction::ManagerDeposit { .. } => InstructionKind::ManagerDeposit,
            VaultInstruction::ManagerWithdraw { .. } => InstructionKind::ManagerWithdraw,
            VaultInstruction::ManagerCollectFees { .. } => InstructionKind::ManagerCollectFees,
            VaultInstruction::UpdateVault(_) => InstructionKind::UpdateVault,
            VaultInstruction::ResetDelegate => InstructionKind::ResetDelegate,
        }
    }

    pub fn discriminant(&self) -> u8 {
        match self {
            VaultInstruction::InitializeVaultWithDrift(_) => 0,
            VaultInstruction::InitializeVaultDepositor => 1,
            VaultInstruction::Deposit { .. } => 2,
            VaultInstruction::RequestWithdraw { .. } => 3,
            VaultInstruction::CancelWithdrawRequest => 4,
            VaultInstruction::Withdraw => 5,
            VaultInstruction::UpdateDelegate { .. } => 6,
            VaultInstruction::ManagerDeposit { .. } => 7,
            VaultInstruction::ManagerWithdraw { .. } => 8,
            VaultInstruction::ManagerCollectFees { .. } => 9,
            VaultInstruction::UpdateVault(_) => 10,
            VaultInstruction::ResetDelegate => 11,
        }
    }

    pub fn layout(&self) -> &'static Layout {
        match self {
            VaultInstruction::InitializeVaultWithDrift(_) => &BASE_VAULT,
            VaultInstruction::InitializeVaultDepositor
            | VaultInstruction::CancelWithdrawRequest
            | VaultInstruction::Withdraw
            | VaultInstruction::ResetDelegate => &EMPTY,
            VaultInstruction::Deposit { .. } | VaultInstruction::ManagerDeposit { .. } => &NAME_AMOUNT,
            VaultInstruction::RequestWithdraw { .. }
            | VaultInstruction::ManagerWithdraw { .. }
            | VaultInstruction::ManagerCollectFees { .. } => &AMOUNT,
            VaultInstruction::UpdateDelegate { .. } => &UPDATE_DELEGATE,
            VaultInstruction::UpdateVault(_) => &UPDATE_VAULT,
        }
    }

    fn values(&self) -> Vec<FieldValue> {
        match self {
            VaultInstruction::InitializeVaultWithDrift(p) => vec![
                FieldValue::Str(p.name.clone()),
                FieldValue::U64(p.lock_in_period),
                FieldValue::U64(p.redeem_period),
                FieldValue::U64(p.max_tokens),
                FieldValue::U64(p.management_fee),
                FieldValue::U64(p.min_deposit_amount),
                FieldValue::U32(p.profit_share),
                FieldValue::U32(p.hurdle_rate),
                FieldValue::U16(p.spot_market_index),
                FieldValue::Bool(p.permissioned),
            ],
            VaultInstruction::InitializeVaultDepositor
            | VaultInstruction::CancelWithdrawRequest
            | VaultInstruction::Withdraw
            | VaultInstruction::ResetDelegate => vec![],
            VaultInstruction::Deposit { name, amount }
            | VaultInstruction::ManagerDeposit { name, amount } => {
                vec![FieldValue::Str(name.clone()), FieldValue::U64(*amount)]
            }
            VaultInstruction::RequestWithdraw { amount }
            | VaultInstruction::ManagerWithdraw { amount }
            | VaultInstruction::ManagerCollectFees { amount } => vec![FieldValue::U64(*amount)],
            VaultInstruction::UpdateDelegate {
                name,
                delegate,
                sub_account,
            } => vec![
                FieldValue::Str(name.clone()),
                FieldValue::Str(delegate.clone()),
                FieldValue::U16(*sub_account),
            ],
            VaultInstruction::UpdateVault(p) => vec![
                FieldValue::U64(p.lock_in_period),
                FieldValue::U64(p.redeem_period),
                FieldValue::U64(p.max_tokens),
                FieldValue::U64(p.management_fee),
                FieldValue::U64(p.min_deposit_amount),
                FieldValue::U32(p.profit_share),
                FieldValue::U32(p.hurdle_rate),
                FieldValue::Bool(p.permissioned),
            ],
        }
    }

    pub fn pack(&self) -> Result<Vec<u8>> {
        layout::encode(self.layout(), self.discriminant(), &self.values())
    }

    pub fn unpack(input: &[u8]) -> Result<Self> {
        let (&variant, _) = input
            .split_first()
            .ok_or_else(|| VaultClientError::Decode("empty instruction data".to_string()))?;
        let layout = layout_for(variant, SchemaVersion::V2)?;
        let (_, values) = layout::decode(layout, input)?;
        let mut fields = Fields::new(layout, values);

        Ok(match variant {
            0 => Self::InitializeVaultWithDrift(VaultParams {
                name: fields.str()?,
                lock_in_period: fields.u64()?,
                redeem_period: fields.u64()?,
                max_tokens: fields.u64()?,
                management_fee: fields.u64()?,
                min_deposit_amount: fields.u64()?,
                profit_share: fields.u32()?,
                hurdle_rate: fields.u32()?,
                spot_market_index: fields.u16()?,
                permissioned: fields.bool()?,
            }),
            1 => Self::InitializeVaultDepositor,
            2 => Self::Deposit {
                name: fields.str()?,
                amount: fields.u64()?,
            },
            3 => Self::RequestWithdraw {
                amount: fields.u64()?,
            },
            4 => Self::CancelWithdrawRequest,
            5 => Self::Withdraw,
            6 => Self::UpdateDelegate {
                name: fields.str()?,
                delegate: fields.str()?,
                sub_account: fields.u16()?,
            },
            7 => Self::ManagerDeposit {
                name: fields.str()?,
                amount: fields.u64()?,
            },
            8 => Self::ManagerWithdraw {
                amount: fields.u64()?,
            },
            9 => Self::ManagerCollectFees {
                amount: fields.u64()?,
            },
            10 => Self::UpdateVault(UpdateVaultParams {
                lock_in_period: fields.u64()?,
                redeem_period: fields.u64()?,
                max_tokens: fields.u64()?,
                management_fee: fields.u64()?,
                min_deposit_amount: fields.u64()?,
                profit_share: fields.u32()?,
                hurdle_rate: fields.u32()?,
                permissioned: fields.bool()?,
            }),
            11 => Self::ResetDelegate,
            _ => return Err(VaultClientError::UnknownVariant(variant)),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundStatus {
    #[default]
    Nil,
    Deposited,
    Pending,
    Failed,
    Withdrawn,
    Locked,
}

impl FundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundStatus::Nil => "Nil",
            FundStatus::Deposited => "Deposited",
            FundStatus::Pending => "Pending",
            FundStatus::Failed => "Failed",
            FundStatus::Withdrawn => "Withdrawn",
            FundStatus::Locked => "Locked",
        }
    }
}

impl FromStr for FundStatus {
    type Err = VaultClientError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "Nil" => FundStatus::Nil,
            "Deposited" => FundStatus::Deposited,
            "Pending" => FundStatus::Pending,
            "Failed" => FundStatus::Failed,
            "Withdrawn" => FundStatus::Withdrawn,
            "Locked" => FundStatus::Locked,
            other => return Err(VaultClientError::Decode(format!("unknown fund status {other}"))),
        })
    }
}

impl fmt::Display for FundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotStatus {
    #[default]
    Init,
    Active,
    Inactive,
    Paused,
    Error,
    Stopped,
}

impl BotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotStatus::Init => "Init",
            BotStatus::Active => "Active",
            BotStatus::Inactive => "Inactive",
            BotStatus::Paused => "Paused",
            BotStatus::Error => "Error",
            BotStatus::Stopped => "Stopped",
        }
    }
}

impl FromStr for BotStatus {
    type Err = VaultClientError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "Init" => BotStatus::Init,
            "Active" => BotStatus::Active,
            "Inactive" => BotStatus::Inactive,
            "Paused" => BotStatus::Paused,
            "Error" => BotStatus::Error,
            "Stopped" => BotStatus::Stopped,
            other => return Err(VaultClientError::Decode(format!("unknown bot status {other}"))),
        })
    }
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations of the user-info program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInfoAction {
    InitializeVault = 0,
    Deposit = 1,
    Withdraw = 2,
    InitializeDrift = 3,
    UpdateDelegate = 4,
}

impl TryFrom<u8> for UserInfoAction {
    type Error = VaultClientError;

    fn try_from(variant: u8) -> Result<Self> {
        Ok(match variant {
            0 => UserInfoAction::InitializeVault,
            1 => UserInfoAction::Deposit,
            2 => UserInfoAction::Withdraw,
            3 => UserInfoAction::InitializeDrift,
            4 => UserInfoAction::UpdateDelegate,
            _ => return Err(VaultClientError::UnknownVariant(variant)),
        })
    }
}

/// The record every user-info instruction carries, whatever the action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfoRecord {
    pub vault_id: String,
    pub user_pubkey: String,
    pub amount: u64,
    pub fund_status: FundStatus,
    pub bot_status: BotStatus,
    pub market_index: u16,
    pub delegate: String,
    pub sub_account: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfoInstruction {
    pub action: UserInfoAction,
    pub record: UserInfoRecord,
}

impl UserInfoInstruction {
    pub fn pack(&self) -> Result<Vec<u8>> {
        let r = &self.record;
        layout::encode(
            &USER_INFO,
            self.action as u8,
            &[
                FieldValue::Str(r.vault_id.clone()),
                FieldValue::Str(r.user_pubkey.clone()),
                FieldValue::U64(r.amount),
                FieldValue::Str(r.fund_status.to_string()),
                FieldValue::Str(r.bot_status.to_string()),
                FieldValue::U16(r.market_index),
                FieldValue::Str(r.delegate.clone()),
                FieldValue::U16(r.sub_account),
            ],
        )
    }

    pub fn unpack(input: &[u8]) -> Result<Self> {
        let (variant, values) = layout::decode(&USER_INFO, input)?;
        let action = UserInfoAction::try_from(variant)?;
        let mut fields = Fields::new(&USER_INFO, values);
        Ok(Self {
            action,
            record: UserInfoRecord {
                vault_id: fields.str()?,
                user_pubkey: fields.str()?,
                amount: fields.u64()?,
                fund_status: fields.str()?.parse()?,
                bot_status: fields.str()?.parse()?,
                market_index: fields.u16()?,
                delegate: fields.str()?,
                sub_account: fields.u16()?,
            },
        })
    }
}

/// Walks decoded values in layout order.
struct Fields {
    layout: &'static Layout,
    values: std::vec::IntoIter<FieldValue>,
    index: usize,
}

impl Fields {
    fn new(layout: &'static Layout, values: Vec<FieldValue>) -> Self {
        Self {
            layout,
            values: values.into_iter(),
            index: 0,
        }
    }

    fn next(&mut self, expected: FieldKind) -> Result<FieldValue> {
        let count = self.layout.fields.len();
        let field = self
            .layout
            .fields
            .get(self.index)
            .ok_or(VaultClientError::FieldCountMismatch {
                expected: count,
                found: self.index + 1,
            })?;
        let value = self.values.next().ok_or(VaultClientError::FieldCountMismatch {
            expected: count,
            found: self.index,
        })?;
        self.index += 1;
        if value.kind() != expected {
            return Err(VaultClientError::FieldTypeMismatch {
                field: field.name,
                expected: expected.name(),
                found: value.kind().name(),
            });
        }
        Ok(value)
    }

    fn str(&mut self) -> Result<String> {
        match self.next(FieldKind::Str)? {
            FieldValue::Str(v) => Ok(v),
            other => Err(mismatch(FieldKind::Str, &other)),
        }
    }

    fn u64(&mut self) -> Result<u64> {
        match self.next(FieldKind::U64)? {
            FieldValue::U64(v) => Ok(v),
            other => Err(mismatch(FieldKind::U64, &other)),
        }
    }

    fn u32(&mut self) -> Result<u32> {
        match self.next(FieldKind::U32)? {
            FieldValue::U32(v) => Ok(v),
            other => Err(mismatch(FieldKind::U32, &other)),
        }
    }

    fn u16(&mut self) -> Result<u16> {
        match self.next(FieldKind::U16)? {
            FieldValue::U16(v) => Ok(v),
            other => Err(mismatch(FieldKind::U16, &other)),
        }
    }

    fn bool(&mut self) -> Result<bool> {
        match self.next(FieldKind::Bool)? {
            FieldValue::Bool(v) => Ok(v),
            other => Err(mismatch(FieldKind::Bool, &other)),
        }
    }
}

fn mismatch(expected: FieldKind, found: &FieldValue) -> VaultClientError {
    VaultClientError::Decode(format!(
        "expected {}, decoded {}",
        expected.name(),
        found.kind().name()
    ))
}
