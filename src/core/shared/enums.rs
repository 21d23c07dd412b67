//! Persisted enumerations.
//!
//! Every enum here is stored as its text value in a VARCHAR column and
//! exchanged as the same text over JSON. The text values are a durable
//! contract with reporting and export consumers: values may be added,
//! never renamed or removed.

use crate::error::WorkflowError;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = WorkflowError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(WorkflowError::Validation(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

// ============================================================================
// ASSIGNMENT LIFECYCLE
// ============================================================================

string_enum! {
    pub enum AssignmentType {
        Assignment => "ASSIGNMENT",
        Training => "TRAINING",
        Development => "DEVELOPMENT",
    }
}

impl AssignmentType {
    /// Segment used inside the assignment number.
    pub fn number_code(&self) -> &'static str {
        match self {
            Self::Assignment => "ASG",
            Self::Training => "TRN",
            Self::Development => "DEV",
        }
    }
}

string_enum! {
    /// Coarse lifecycle position. Declaration order is the only legal order.
    pub enum WorkflowStage {
        Registration => "REGISTRATION",
        TlAssignment => "TL_ASSIGNMENT",
        DetailEntry => "DETAIL_ENTRY",
        Active => "ACTIVE",
        Completed => "COMPLETED",
    }
}

string_enum! {
    pub enum RegistrationStatus {
        PendingApproval => "PENDING_APPROVAL",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

string_enum! {
    /// `Rejected` is only read from older rows; rejection now returns a section to `Draft`.
    pub enum SectionStatus {
        Draft => "DRAFT",
        Submitted => "SUBMITTED",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

string_enum! {
    pub enum Section {
        Basic => "basic",
        Cost => "cost",
        Team => "team",
        Milestone => "milestone",
        Revenue => "revenue",
    }
}

string_enum! {
    pub enum OperationalStatus {
        Pipeline => "Pipeline",
        NotStarted => "Not Started",
        Ongoing => "Ongoing",
        Completed => "Completed",
        OnHold => "On Hold",
        Cancelled => "Cancelled",
    }
}

string_enum! {
    pub enum MilestoneStatus {
        Pending => "Pending",
        InProgress => "In Progress",
        Completed => "Completed",
        Delayed => "Delayed",
        Cancelled => "Cancelled",
    }
}

string_enum! {
    pub enum TeamRole {
        TeamLeader => "TEAM_LEADER",
        Member => "MEMBER",
        Consultant => "CONSULTANT",
    }
}

// ============================================================================
// APPROVAL REQUESTS
// ============================================================================

string_enum! {
    pub enum ApprovalRequestType {
        Registration => "REGISTRATION",
        ChangeRequest => "CHANGE_REQUEST",
    }
}

string_enum! {
    pub enum RequestStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Escalated => "ESCALATED",
    }
}

string_enum! {
    /// Team-leader review stage of a change request.
    pub enum ReviewStatus {
        Pending => "PENDING",
        Forwarded => "FORWARDED",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

string_enum! {
    pub enum ChangeType {
        MilestoneChange => "MILESTONE_CHANGE",
        CostChange => "COST_CHANGE",
        TeamChange => "TEAM_CHANGE",
        RevenueChange => "REVENUE_CHANGE",
    }
}

impl ChangeType {
    pub fn section(&self) -> Section {
        match self {
            Self::MilestoneChange => Section::Milestone,
            Self::CostChange => Section::Cost,
            Self::TeamChange => Section::Team,
            Self::RevenueChange => Section::Revenue,
        }
    }
}

// ============================================================================
// INVOICING AND REVENUE
// ============================================================================

string_enum! {
    pub enum InvoiceStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

string_enum! {
    pub enum InvoiceType {
        Advance => "ADVANCE",
        Subsequent => "SUBSEQUENT",
        Final => "FINAL",
    }
}

string_enum! {
    pub enum RevenueType {
        Invoice80 => "INVOICE_80",
        Payment20 => "PAYMENT_20",
    }
}

string_enum! {
    pub enum PaymentMode {
        Neft => "NEFT",
        Rtgs => "RTGS",
        Cheque => "CHEQUE",
        Dd => "DD",
        Cash => "CASH",
    }
}

// ============================================================================
// ROLES AND SCOPES
// ============================================================================

string_enum! {
    /// Declaration order is the seniority order used when sorting resolved roles.
    pub enum RoleType {
        Admin => "ADMIN",
        Dg => "DG",
        DdgOne => "DDG-I",
        DdgTwo => "DDG-II",
        RdHead => "RD_HEAD",
        GroupHead => "GROUP_HEAD",
        Finance => "FINANCE",
        TeamLeader => "TEAM_LEADER",
        Officer => "OFFICER",
    }
}

impl RoleType {
    pub fn is_ddg(&self) -> bool {
        matches!(self, Self::DdgOne | Self::DdgTwo)
    }

    pub fn is_head_or_above(&self) -> bool {
        matches!(
            self,
            Self::Admin | Self::Dg | Self::DdgOne | Self::DdgTwo | Self::RdHead | Self::GroupHead
        )
    }
}

string_enum! {
    pub enum ScopeType {
        Global => "GLOBAL",
        Office => "OFFICE",
        Group => "GROUP",
        Assignment => "ASSIGNMENT",
        Individual => "INDIVIDUAL",
    }
}

string_enum! {
    pub enum HierarchyEntity {
        Office => "OFFICE",
        Group => "GROUP",
    }
}

string_enum! {
    pub enum Permission {
        ViewAllMis => "view_all_mis",
        ViewOfficeMis => "view_office_mis",
        ExportData => "export_data",
        ImportData => "import_data",
        ManageConfig => "manage_config",
        ManageUsers => "manage_users",
        ResetPassword => "reset_password",
        ChangeRoles => "change_roles",
        ApproveEscalated => "approve_escalated",
        AllocateTeamLeader => "allocate_team_leader",
        ApproveAssignment => "approve_assignment",
        ApproveMilestone => "approve_milestone",
        ApproveRevenueShare => "approve_revenue_share",
        ApproveInvoice => "approve_invoice",
        RecordPayment => "record_payment",
        SetTeam => "set_team",
        FillAssignmentDetails => "fill_assignment_details",
        FillMilestoneDetails => "fill_milestone_details",
        RegisterAssignment => "register_assignment",
        RaiseRequest => "raise_request",
        DownloadReports => "download_reports",
    }
}
